use calendar_chroma::Cli;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "calendar_chroma=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    Cli::run()
}
