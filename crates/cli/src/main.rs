use clap::Parser;

use quartermaster_cli::{Cli, run};
use quartermaster_infra::QuartermasterConfig;

fn main() -> anyhow::Result<()> {
    quartermaster_observability::init();

    let cli = Cli::parse();
    let config = QuartermasterConfig::from_env()?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(cli, config, &mut out)
}
