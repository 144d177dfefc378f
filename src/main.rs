use clap::{Parser, Subcommand};
use plainlog::{config, imaging, ogp, output, render, walk};
use std::path::{Path, PathBuf};

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup — trivial, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "plainlog")]
#[command(about = "Static blog compiler for Markdown journals")]
#[command(long_about = "\
Static blog compiler for Markdown journals

Your filesystem is the data source. Each directory holding an index.md
becomes one entry; directory names decide ordering, so date-named trees
come out newest-first.

Content structure:

  config.toml                  # Site config (paths, author, images, ogp)
  posts/                       # Content root (document_root)
  ├── 2025/
  │   ├── 08/
  │   │   └── shipping/
  │   │       ├── index.md     # title: header + Markdown body
  │   │       ├── photo.jpg    # referenced images get -full/-thumb variants
  │   │       ├── meta.toml    # generated sidecar (publish/update dates)
  │   │       └── ogp.png      # generated preview card (when enabled)
  │   └── 07/
  │       └── hello/
  │           └── index.md
  └── drafts/                  # no index.md = skipped, still descended
  public/
  ├── index.html               # generated site index (index_html)
  └── feed.xml                 # generated RSS feed (feed_xml)

The first line of index.md is the title header:  title: My Post

Run 'plainlog gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile the content tree into entry pages, an index, and a feed
    Build {
        /// Site configuration file
        #[arg(default_value = "config.toml")]
        config: PathBuf,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Build { config: config_path } => {
            let config = config::load_config(&config_path)?;
            let base_dir = config_path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."))
                .to_path_buf();
            let root = config.document_root_in(&base_dir);

            let backend = imaging::RustBackend::new();
            let mut renderer = ogp::PreviewRenderer::new(config.ogp.clone());
            let outcome = walk::collect_entries(&config, &root, &backend, &mut renderer)?;

            render::write_site(&config, &base_dir, &outcome.entries)?;

            output::print_build_output(&outcome.entries, &root, &outcome.warnings, &outcome.stats);
            println!(
                "Wrote {} and {}",
                config.index_html_in(&base_dir).display(),
                config.feed_xml_in(&base_dir).display()
            );
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
