use dtm_vectorizer::{Corpus, EmbeddingModel, LsaConfig, LsaModel, Stats};

fn main() {
    // build corpus
    let mut corpus: Corpus = [
        "This is a text about an apple. There are many texts about apples.",
        "Pears and apples are good but not exotic. An apple a day keeps the doctor away.",
        "Fruits are good for you.",
        "This phrase has nothing to do with the others...",
        "Simple text, little info inside",
    ]
    .into_iter()
    .collect();
    corpus.update_lexicon();

    // count matrix
    let dtm = corpus.dtm::<i64>().expect("lexicon was built");
    println!("dtm: {} documents x {} terms", dtm.shape().0, dtm.shape().1);

    // train
    let model: LsaModel = LsaModel::new(&dtm, LsaConfig::default().with_k(3).with_stats(Stats::Tf))
        .expect("valid rank");

    // search
    let query = "Apples and an exotic fruit.";
    let hits = model.cosine(corpus.documents(), query, 5);

    // print result
    println!("query: {query}");
    for hit in hits.iter() {
        println!("{:.4}  {}", hit.score, corpus[hit.index].text());
    }
    println!("{:#?}", hits);
}
