use clap::Parser;

fn main() -> anyhow::Result<()> {
    cqlc::init();

    let cli = cqlc::cli::Cli::parse();
    cqlc::cli::run(cli)
}
