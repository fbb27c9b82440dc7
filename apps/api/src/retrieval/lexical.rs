//! BM25 Okapi lexical index over tokenized bullet texts.

use std::collections::HashMap;

const K1: f64 = 1.5;
const B: f64 = 0.75;
/// Floor for negative idf values, as a fraction of the mean idf.
const IDF_EPSILON: f64 = 0.25;

#[derive(Debug, Clone, Default)]
pub struct LexicalIndex {
    /// Per-document term frequencies.
    term_freqs: Vec<HashMap<String, u32>>,
    doc_lens: Vec<usize>,
    avg_doc_len: f64,
    idf: HashMap<String, f64>,
}

impl LexicalIndex {
    pub fn build(corpus: &[Vec<String>]) -> Self {
        if corpus.is_empty() {
            return Self::default();
        }

        let mut term_freqs = Vec::with_capacity(corpus.len());
        let mut doc_lens = Vec::with_capacity(corpus.len());
        let mut doc_freq: HashMap<String, u32> = HashMap::new();

        for tokens in corpus {
            let mut freqs: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *freqs.entry(token.clone()).or_insert(0) += 1;
            }
            for term in freqs.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            doc_lens.push(tokens.len());
            term_freqs.push(freqs);
        }

        let n = corpus.len() as f64;
        let avg_doc_len = doc_lens.iter().sum::<usize>() as f64 / n;

        let mut idf: HashMap<String, f64> = doc_freq
            .into_iter()
            .map(|(term, df)| {
                let df = df as f64;
                (term, (n - df + 0.5).ln() - (df + 0.5).ln())
            })
            .collect();

        // Terms present in more than half the corpus get a negative idf; floor them.
        let mean_idf = idf.values().sum::<f64>() / idf.len().max(1) as f64;
        let floor = IDF_EPSILON * mean_idf;
        for value in idf.values_mut() {
            if *value < 0.0 {
                *value = floor;
            }
        }

        Self {
            term_freqs,
            doc_lens,
            avg_doc_len,
            idf,
        }
    }

    pub fn len(&self) -> usize {
        self.term_freqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.term_freqs.is_empty()
    }

    /// Scores every document against the query terms, in corpus order.
    pub fn scores(&self, query: &[String]) -> Vec<f64> {
        let mut scores = vec![0.0; self.len()];
        if self.is_empty() || self.avg_doc_len == 0.0 {
            return scores;
        }

        for term in query {
            let Some(&idf) = self.idf.get(term) else {
                continue;
            };
            for (doc, freqs) in self.term_freqs.iter().enumerate() {
                let tf = freqs.get(term).copied().unwrap_or(0) as f64;
                if tf == 0.0 {
                    continue;
                }
                let length_norm = 1.0 - B + B * self.doc_lens[doc] as f64 / self.avg_doc_len;
                scores[doc] += idf * (tf * (K1 + 1.0)) / (tf + K1 * length_norm);
            }
        }

        scores
    }
}
