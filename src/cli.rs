//! Command-line interface definitions for the article bundler.
//!
//! All request fields can be provided via command-line flags; the request
//! can also be read as a JSON body from a file, matching the shape
//! `{ instruction?, titles?, count?, modifier?, wordLength? }`.

use clap::Parser;

use crate::archive::ARCHIVE_FILENAME;

/// Command-line arguments for the article bundler.
///
/// # Examples
///
/// ```sh
/// # Preview the batch before paying for rendering
/// article_bundler -i "Write about cats" -c 3 --preview
///
/// # Generate and bundle 5 articles through the outline flow
/// article_bundler -i "Write about cats" -c 5 --outlines -o cats.zip
///
/// # Explicit titles, no title generation
/// article_bundler -t "Intro" -t "Deep Dive" -o bundle.zip
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Master instruction that every generated article follows
    #[arg(short, long)]
    pub instruction: Option<String>,

    /// Explicit article title (repeatable); bypasses title generation
    #[arg(short = 't', long = "title")]
    pub titles: Vec<String>,

    /// Number of articles to generate (clamped to 1..=20)
    #[arg(short, long)]
    pub count: Option<i64>,

    /// Prefix prepended to every article title
    #[arg(short, long)]
    pub modifier: Option<String>,

    /// Target word count for expanded articles
    #[arg(short = 'w', long)]
    pub word_length: Option<u32>,

    /// Generate outlines first, then expand each outline into a full body
    #[arg(long)]
    pub outlines: bool,

    /// Print the title/filename preview as JSON instead of producing the archive
    #[arg(long)]
    pub preview: bool,

    /// Output path for the zip archive
    #[arg(short, long, default_value = ARCHIVE_FILENAME)]
    pub output: String,

    /// Read the request as a JSON body from this file instead of flags
    #[arg(long)]
    pub request: Option<String>,

    /// Optional path to a YAML config file
    #[arg(long)]
    pub config: Option<String>,

    /// API key for the generation service
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "article_bundler",
            "--instruction",
            "Write about cats",
            "--count",
            "3",
            "--preview",
        ]);

        assert_eq!(cli.instruction.as_deref(), Some("Write about cats"));
        assert_eq!(cli.count, Some(3));
        assert!(cli.preview);
        assert_eq!(cli.output, "articles_bundle.zip");
    }

    #[test]
    fn test_cli_repeatable_titles() {
        let cli = Cli::parse_from([
            "article_bundler",
            "-t",
            "Intro",
            "-t",
            "Deep Dive",
            "-o",
            "/tmp/bundle.zip",
        ]);

        assert_eq!(cli.titles, vec!["Intro", "Deep Dive"]);
        assert_eq!(cli.output, "/tmp/bundle.zip");
        assert!(!cli.outlines);
    }
}
