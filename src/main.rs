//! Collect-only demo: declares a small set of units and prints their trees.

use collecta::{
    before_each, describe, it, suite, test, BodyResult, DeclarationUnit, TestContext,
};
use serde_json::json;

fn adds(args: &[serde_json::Value]) -> BodyResult {
    let sum = args[0].as_i64().unwrap_or(0) + args[1].as_i64().unwrap_or(0);
    if Some(sum) == args[2].as_i64() {
        Ok(())
    } else {
        Err(format!("expected {} but got {sum}", args[2]).into())
    }
}

fn units() -> Vec<DeclarationUnit> {
    vec![
        DeclarationUnit::new("demos/math.rs", || {
            describe("arithmetic", || {
                before_each(|_, _| Ok(()));
                test()
                    .each(vec![json!([1, 1, 2]), json!([2, 3, 5])])
                    .declare("%i + %i = %i", adds);
                test().todo().stub("division by zero");
            });
            it("standalone", |ctx: &TestContext| {
                ctx.expect().assert(true, "always true")?;
                Ok(())
            });
            Ok(())
        }),
        DeclarationUnit::new("demos/slow.rs", || {
            suite().concurrent().declare("network", || {
                test().repeats().stub("flaky request");
                test().skip_if(cfg!(windows)).stub("unix socket");
            });
            Ok(())
        }),
    ]
}

fn main() {
    std::process::exit(collecta::harness_main(&units()));
}
