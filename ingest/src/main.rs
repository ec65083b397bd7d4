use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;
use wordstat_core::{AnalyticsError, Analyzer, AnalyzerConfig, CorpusStore, DocId, SledStore, UserId};

use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "ingest")]
#[command(about = "Upload text files into a word-statistics store and inspect the results", long_about = None)]
struct Cli {
    /// Data directory for the document store
    #[arg(long, default_value = "./data")]
    data: String,
    /// User the documents belong to
    #[arg(long)]
    user: UserId,
    /// Analyzer config (JSON); defaults apply when omitted
    #[arg(long)]
    config: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a file, or every matching file under a directory
    Upload {
        #[arg(long)]
        input: String,
        /// Also add each uploaded document to this collection
        #[arg(long)]
        collection: Option<u64>,
        /// File extensions picked up when walking a directory
        #[arg(long, value_delimiter = ',', default_value = "txt,md")]
        ext: Vec<String>,
    },
    /// Print merged statistics of a collection
    Stats {
        #[arg(long)]
        collection: u64,
    },
    /// Print stored statistics of one document
    Document {
        #[arg(long)]
        id: DocId,
    },
    /// Print the Huffman encoding of one document
    Huffman {
        #[arg(long)]
        id: DocId,
    },
}

#[derive(Debug, Default, Serialize)]
struct IngestSummary {
    uploaded: Vec<DocId>,
    rejected: Vec<String>,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AnalyzerConfig::from_json_file(path)?,
        None => AnalyzerConfig::default(),
    };
    let analyzer = Analyzer::new(SledStore::open(&cli.data)?, config)?;

    match cli.command {
        Commands::Upload { input, collection, ext } => {
            let summary = upload(&analyzer, cli.user, Path::new(&input), collection, &ext)?;
            analyzer.store().flush()?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Stats { collection } => {
            let stats = analyzer.collection_statistics(cli.user, collection)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Document { id } => {
            let stats = analyzer.document_statistics(cli.user, id)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Huffman { id } => {
            let encoded = analyzer.encode_document(cli.user, id)?;
            println!("{}", serde_json::to_string_pretty(&encoded)?);
        }
    }
    Ok(())
}

fn collect_files(input: &Path, ext: &[String]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(e) = p.extension().and_then(|s| s.to_str()) {
                    if ext.iter().any(|want| want.eq_ignore_ascii_case(e)) {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
        files.sort();
    } else if input.is_file() {
        files.push(input.to_path_buf());
    }
    files
}

fn upload(
    analyzer: &Analyzer<SledStore>,
    user: UserId,
    input: &Path,
    collection: Option<u64>,
    ext: &[String],
) -> Result<IngestSummary> {
    if let Some(id) = collection {
        analyzer.store().get_collection(user, id)?;
    }
    let mut summary = IngestSummary::default();
    for file in collect_files(input, ext) {
        let bytes = fs::read(&file)?;
        let name = file.file_name().and_then(|s| s.to_str()).unwrap_or("untitled").to_string();
        match analyzer.analyze_upload(user, &name, &bytes) {
            Ok(report) => {
                if let Some(id) = collection {
                    analyzer.store().add_to_collection(user, id, report.document_id)?;
                }
                summary.uploaded.push(report.document_id);
            }
            Err(err @ (AnalyticsError::EmptyCorpus | AnalyticsError::DecodeFailure)) => {
                tracing::warn!(file = %file.display(), error = %err, "skipped file");
                summary.rejected.push(file.display().to_string());
            }
            Err(err) => return Err(err.into()),
        }
    }
    tracing::info!(user, uploaded = summary.uploaded.len(), rejected = summary.rejected.len(), "ingest complete");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uploads_matching_files_and_skips_empty_ones() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "the cat sat").unwrap();
        fs::write(dir.path().join("b.md"), "a dog ran").unwrap();
        fs::write(dir.path().join("c.txt"), "12 34").unwrap();
        fs::write(dir.path().join("ignored.bin"), "binary words").unwrap();

        let ext = vec!["txt".to_string(), "md".to_string()];
        assert_eq!(collect_files(dir.path(), &ext).len(), 3);

        let analyzer = Analyzer::new(SledStore::temporary().unwrap(), AnalyzerConfig::default()).unwrap();
        let coll = analyzer.store().create_collection(1, "batch", None).unwrap();
        let summary = upload(&analyzer, 1, dir.path(), Some(coll.id), &ext).unwrap();
        assert_eq!(summary.uploaded.len(), 2);
        assert_eq!(summary.rejected.len(), 1);
        assert_eq!(analyzer.store().list_documents_in_collection(coll.id).unwrap().len(), 2);
    }
}
