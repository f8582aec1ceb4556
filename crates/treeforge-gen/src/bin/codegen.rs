use clap::Parser;
use miette::{IntoDiagnostic, Result};

use treeforge_gen::cli::Args;
use treeforge_gen::codegen;

fn main() -> Result<()> {
    let args = Args::parse();

    let src = std::fs::read_to_string(&args.schema_file).into_diagnostic()?;
    let spec = treeforge_gen::compile(&src)?;

    let main_src = codegen::render(codegen::emit_main(&spec))?;
    std::fs::write(&args.out_main, main_src).into_diagnostic()?;

    let impl_src = codegen::render(codegen::emit_impl(&spec))?;
    std::fs::write(&args.out_impl, impl_src).into_diagnostic()?;

    if let Some(out_secondary) = &args.out_secondary {
        let secondary_src = codegen::render(codegen::emit_minimal(&spec))?;
        std::fs::write(out_secondary, secondary_src).into_diagnostic()?;
    }

    println!("Compiled {:?} -> {:?}, {:?}", args.schema_file, args.out_main, args.out_impl);

    Ok(())
}
