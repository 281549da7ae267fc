use dtm_vectorizer::{load_rp_model, save_rp_model, Corpus, EmbeddingModel, RpConfig, RpModel, Stats};

fn main() {
    let mut corpus: Corpus = [
        "rust is fast and memory safe",
        "rust has a strong type system",
        "python is dynamic and flexible",
        "sparse random projections preserve distances",
    ]
    .into_iter()
    .collect();
    corpus.update_lexicon();
    let dtm = corpus.dtm::<u32>().expect("lexicon was built");

    let config = RpConfig::default().with_k(4).with_stats(Stats::Bm25).with_seed(42);
    let model: RpModel = RpModel::new(&dtm, config).expect("valid parameters");
    println!("vocabulary {} -> {} dims, density {:.3}", model.size().0, model.size().1, model.density());

    // persist, reload at lower precision
    let path = std::env::temp_dir().join("dtm_vectorizer_rp_demo.txt");
    save_rp_model(&model, &path).expect("writable temp dir");
    let small = load_rp_model::<f32, _>(&path).expect("model was just written");

    let query = "is rust safe";
    for (name, hits) in [
        ("f64", model.cosine(corpus.documents(), query, 2).indices()),
        ("f32", small.cosine(corpus.documents(), query, 2).indices()),
    ] {
        println!("{name}: {hits:?}");
    }
    println!("similarity: {:.4}", model.similarity("rust type", "rust safe"));
}
