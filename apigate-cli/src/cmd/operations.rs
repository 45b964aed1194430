use apigate_exec::Registry;

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::OutputArgs;

pub fn operations_cmd(kind: Option<&str>, output: OutputArgs) -> i32 {
    let registry = Registry::builtin();
    let contracts: Vec<_> = match kind {
        Some(kind) => match registry.contracts().find(|c| c.kind == kind) {
            Some(c) => vec![c],
            None => {
                print_error(output.format, output.quiet, &format!("unknown operation kind: {kind}"));
                return exit_codes::VALIDATION_FAILED;
            }
        },
        None => registry.contracts().collect(),
    };

    if output.format == OutputFormat::Json {
        print_result(output.format, output.quiet, &contracts);
        return exit_codes::SUCCESS;
    }
    if output.quiet {
        return exit_codes::SUCCESS;
    }
    for c in contracts {
        println!("{:<14} {:<10} {}", c.kind, c.category.as_str(), c.description);
        if kind.is_some() {
            for input in &c.inputs {
                println!("  {:<14} {:<8} {}", input.name, input.spec.cardinality.to_string(), input.spec.description);
            }
        }
    }
    exit_codes::SUCCESS
}
