use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tagwatch")]
#[command(author, version, about = "Notifies you when new moulinette results land", long_about = None)]
#[command(after_help = r#"Examples:
  tagwatch watch https://intra.forge.epita.fr/epita-ing-assistants-acu/piscine-2026/root-hello-world
  tagwatch check http://localhost:3000/          Show the tags a page exposes
  tagwatch status                                List watched pages
  tagwatch serve                                 Run the mock intranet on :3000

Local testing:
  1. tagwatch serve
  2. tagwatch watch http://localhost:3000/ --interval 5s
  3. tagwatch mock add --percent 80
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch a project page and notify on new results
    #[command(after_help = r#"Keys:
  Enter    toggle watching on/off
  q        quit (the watch state is kept for next time)
"#)]
    Watch {
        /// Project page URL
        #[arg(value_name = "URL")]
        url: String,

        /// Poll interval (e.g. 30s, 2m); defaults to the configured interval
        #[arg(long)]
        interval: Option<String>,
    },

    /// Fetch a page once and show which tags would notify (no state change)
    Check {
        /// Project page URL
        #[arg(value_name = "URL")]
        url: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List persisted watch states
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the mock intranet server
    Serve {
        /// Port to listen on
        #[arg(long, default_value_t = 3000)]
        port: u16,

        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Drive a running mock server
    #[command(subcommand)]
    Mock(MockCommands),
}

#[derive(Subcommand)]
pub enum MockCommands {
    /// Add a synthetic tag
    Add {
        #[arg(long)]
        name: Option<String>,

        /// Success percentage (default 100)
        #[arg(long)]
        percent: Option<String>,

        /// Status token (default SUCCEEDED)
        #[arg(long)]
        status: Option<String>,

        /// Mock server base URL
        #[arg(long, default_value = "http://localhost:3000")]
        server: String,
    },

    /// List the synthetic tags
    List {
        #[arg(long, default_value = "http://localhost:3000")]
        server: String,
    },

    /// Remove every synthetic tag
    Reset {
        #[arg(long, default_value = "http://localhost:3000")]
        server: String,
    },
}
