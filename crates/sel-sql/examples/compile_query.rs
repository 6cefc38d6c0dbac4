//! Compile a SEL query from the command line (or a built-in sample)
//! and print the generated SQL with its parameters.
//!
//! ```sh
//! cargo run --example compile_query -- '{"target":"Note","where":{"isEmpty":{"field":"Example"}}}'
//! ```

use sel_schema::EntityRegistry;
use sel_sql::{Evaluator, OperatorRegistry};

const SAMPLE: &str = r#"{
    "target": "Note",
    "alias": "n",
    "where": { "and": [
        { "isEmpty": { "field": "Example" } },
        { "exists": { "query": {
            "target": "Suggestion",
            "where": { "and": [
                { "==": [{ "prop": "noteId" }, { "ref": ["n", "id"] }] },
                { "==": [{ "prop": "status" }, "pending"] }
            ]}
        }}}
    ]},
    "orderBy": [{ "field": "mod", "desc": true }],
    "limit": 50
}"#;

fn main() {
    tracing_subscriber::fmt().with_env_filter("debug").init();

    let input = std::env::args().nth(1).unwrap_or_else(|| SAMPLE.to_owned());

    let query = match sel_ast::parse_query(&input) {
        Ok(query) => query,
        Err(err) => {
            eprintln!("parse error: {err}");
            std::process::exit(1);
        }
    };

    let entities = EntityRegistry::new();
    let operators = OperatorRegistry::new();
    let evaluator = Evaluator::new(&entities, &operators);

    match evaluator.compile(&query) {
        Ok(compiled) => {
            println!("SQL:\n  {}", compiled.sql);
            println!("Params:");
            for (i, param) in compiled.params.iter().enumerate() {
                println!("  ${}: {:?}", i + 1, param);
            }
        }
        Err(err) => {
            eprintln!("compile error at {}: {err}", err.path());
            std::process::exit(1);
        }
    }
}
