use clap::Parser;
use eyre::{Result, WrapErr};
use scripts::{cli::Cli, types::DeployContext, utils::setup_logging};

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let ctx = DeployContext::from_cli(&cli)?;
    cli.command
        .run(&ctx, &cli.ledger_dir)
        .wrap_err_with(|| format!("deployment to {} failed", ctx.network))
}
