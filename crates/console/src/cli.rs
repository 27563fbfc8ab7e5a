use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "dealdesk",
    version,
    about = "Terminal console for the payment platform admin API"
)]
pub(crate) struct Args {
    #[arg(long, default_value = "config/dealdesk.toml")]
    pub(crate) config: PathBuf,
    #[arg(long, default_value = "logs")]
    pub(crate) log_dir: PathBuf,
    #[arg(long, default_value_t = false)]
    pub(crate) log_to_stderr: bool,
    /// Overrides `api.base_url` from the config file.
    #[arg(long)]
    pub(crate) base_url: Option<String>,
}
