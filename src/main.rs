use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use dtm_vectorizer::{
    load_model, save_model, Bm25Params, Corpus, EmbeddingModel, FloatElement, LsaConfig, LsaModel, ModelKind,
    RpConfig, RpModel, Stats,
};

#[derive(Parser)]
#[command(name = "dtm-vectorizer")]
#[command(about = "Build and query LSA / random projection document embeddings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model on every .txt file under a directory
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: PathBuf,
        /// Output model file
        #[arg(long)]
        output: PathBuf,
        /// lsa or rp
        #[arg(long, default_value = "lsa")]
        model: ModelKind,
        /// Output dimensionality
        #[arg(long)]
        k: Option<usize>,
        /// tf, tfidf or bm25
        #[arg(long, default_value = "tfidf")]
        stats: Stats,
        #[arg(long, default_value_t = 2.0)]
        kappa: f64,
        #[arg(long, default_value_t = 0.75)]
        beta: f64,
        /// Projection density (rp only)
        #[arg(long)]
        density: Option<f64>,
        /// Projection seed (rp only)
        #[arg(long)]
        seed: Option<u64>,
        /// Storage precision of the saved model
        #[arg(long, default_value = "f64", value_parser = ["f32", "f64"])]
        precision: String,
    },
    /// Rank documents by cosine similarity to a query
    Query {
        /// Model file
        #[arg(long)]
        model: PathBuf,
        /// Documents to rank (file or directory)
        #[arg(long)]
        input: PathBuf,
        /// Query text
        #[arg(long)]
        text: String,
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Print the shape and vocabulary of a model
    Info {
        #[arg(long)]
        model: PathBuf,
        /// Also print the embedding of this term
        #[arg(long)]
        word: Option<String>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            input,
            output,
            model,
            k,
            stats,
            kappa,
            beta,
            density,
            seed,
            precision,
        } => {
            let params = BuildParams {
                kind: model,
                k,
                stats,
                bm25: Bm25Params::new(kappa, beta),
                density,
                seed,
            };
            match precision.as_str() {
                "f32" => build::<f32>(&input, &output, &params),
                _ => build::<f64>(&input, &output, &params),
            }
        }
        Commands::Query { model, input, text, top } => query(&model, &input, &text, top),
        Commands::Info { model, word } => info(&model, word.as_deref()),
    }
}

struct BuildParams {
    kind: ModelKind,
    k: Option<usize>,
    stats: Stats,
    bm25: Bm25Params,
    density: Option<f64>,
    seed: Option<u64>,
}

fn build<F: FloatElement>(input: &Path, output: &Path, params: &BuildParams) -> Result<()> {
    let (_, mut corpus) = read_corpus(input)?;
    if corpus.is_empty() {
        bail!("no .txt documents found under {}", input.display());
    }
    corpus.update_lexicon();
    let dtm = corpus.dtm::<u32>()?;
    let (m, n) = dtm.shape();
    tracing::info!(documents = m, terms = n, "ingested documents");

    match params.kind {
        ModelKind::Lsa => {
            let mut config = LsaConfig::default().with_stats(params.stats).with_bm25(params.bm25);
            if let Some(k) = params.k {
                config = config.with_k(k);
            }
            let model: LsaModel<F> = LsaModel::new(&dtm, config)?;
            save_model(&model, output)?;
        }
        ModelKind::Rp => {
            let mut config = RpConfig::default().with_stats(params.stats).with_bm25(params.bm25);
            if let Some(k) = params.k {
                config = config.with_k(k);
            }
            if let Some(density) = params.density {
                config = config.with_density(density);
            }
            if let Some(seed) = params.seed {
                config = config.with_seed(seed);
            }
            let model: RpModel<F> = RpModel::new(&dtm, config)?;
            save_model(&model, output)?;
        }
    }
    println!("saved {} model to {}", params.kind, output.display());
    Ok(())
}

fn query(model_path: &Path, input: &Path, text: &str, top: usize) -> Result<()> {
    let model = load_model::<f64, _>(model_path)
        .with_context(|| format!("loading model {}", model_path.display()))?;
    let (paths, corpus) = read_corpus(input)?;
    let hits = model.cosine(corpus.documents(), text, top);
    for hit in hits.iter() {
        println!("{:.6}\t{}", hit.score, paths[hit.index].display());
    }
    Ok(())
}

fn info(model_path: &Path, word: Option<&str>) -> Result<()> {
    let model = load_model::<f64, _>(model_path)
        .with_context(|| format!("loading model {}", model_path.display()))?;
    let (terms, k) = model.size();
    println!("kind:    {}", model.kind());
    println!("stats:   {}", model.weighting().stats);
    println!("terms:   {terms}");
    println!("dims:    {k}");
    if let Some(word) = word {
        let vector = model.embed_word(word)?;
        let rendered: Vec<String> = vector.iter().map(|v| format!("{v:.6}")).collect();
        println!("{word}: [{}]", rendered.join(", "));
    }
    Ok(())
}

/// Collects `.txt` files (sorted by path) into a corpus.
fn read_corpus(input: &Path) -> Result<(Vec<PathBuf>, Corpus)> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && p.extension().and_then(|s| s.to_str()) == Some("txt") {
                files.push(p.to_path_buf());
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        bail!("input {} does not exist", input.display());
    }
    files.sort();

    let mut corpus = Corpus::default();
    for file in &files {
        let text = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
        corpus.push(text);
    }
    Ok((files, corpus))
}
