//! Backoff scoring over a probability model.
//!
//! All scores are log10-probabilities, so backoff weights and conditional
//! probabilities combine by addition. The backoff chain is a bounded
//! countdown over orders, not open recursion: the order is at most
//! `MAX_ORDER`, so a plain loop both terminates trivially and keeps the hot
//! path allocation-free.
//!
//! Sentence convention (kept consistent with the build side): the context
//! window is seeded once per sentence with the begin-of-sentence id, which
//! is never itself scored or counted; no end-of-sentence marker is
//! appended implicitly. `word_count` is exactly the number of whitespace
//! tokens scored.

use crate::format::MAX_ORDER;
use crate::model::ProbModel;
use crate::trie::chained_position;
use crate::vocab::{WordId, UNK_ID};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

impl ProbModel {
    /// Log10-probability of `word` after `context` (most recent word last).
    ///
    /// Attempts the longest stored order first; each miss adds the backoff
    /// weight of the context that failed to extend, then retries one order
    /// lower. The unigram step always resolves: every word id — the
    /// reserved unknown id included — is a stored unigram.
    pub fn score_word(&self, context: &[WordId], word: WordId) -> f64 {
        let max_context = self.order() - 1;
        let context = &context[context.len().saturating_sub(max_context)..];

        let mut backoff_sum = 0.0f64;
        let mut ids = [UNK_ID; MAX_ORDER as usize];
        for ctx_len in (1..=context.len()).rev() {
            let ctx = &context[context.len() - ctx_len..];
            ids[..ctx_len].copy_from_slice(ctx);
            ids[ctx_len] = word;
            if let Some(pos) = chained_position(&self.levels, &ids[..ctx_len + 1]) {
                let code = self.levels[ctx_len].prob_code(pos);
                return backoff_sum + self.prob_codebook.decode(code) as f64;
            }
            backoff_sum += self.context_backoff(ctx);
        }

        // unigram: guaranteed to resolve via the reserved unknown entry
        let root = self.levels[0].root_range();
        let pos = match self.levels[0].find_child(root, word) {
            Some(pos) => pos,
            None => self.levels[0]
                .find_child(root, UNK_ID)
                .expect("unigram level holds the reserved unknown entry"),
        };
        let code = self.levels[0].prob_code(pos);
        backoff_sum + self.prob_codebook.decode(code) as f64
    }

    /// Backoff weight of a stored context; 0.0 when the context itself was
    /// never stored (nothing to penalize).
    fn context_backoff(&self, context: &[WordId]) -> f64 {
        match chained_position(&self.levels, context) {
            Some(pos) => match self.levels[context.len() - 1].backoff_code(pos) {
                Some(code) => self.backoff_codebook.decode(code) as f64,
                None => 0.0,
            },
            None => 0.0,
        }
    }

    /// Score one whitespace-tokenized sentence.
    ///
    /// Returns `(log10_prob_sum, word_count)`. Empty input scores
    /// `(0.0, 0)`, so blank corpus lines are neutral.
    pub fn score_sentence(&self, sentence: &str) -> (f64, u64) {
        let window = self.order() - 1;
        let mut context: Vec<WordId> = Vec::with_capacity(window + 1);
        if window > 0 {
            context.push(self.bos_id);
        }

        let mut log10_sum = 0.0f64;
        let mut words = 0u64;
        for token in sentence.split_whitespace() {
            let id = self.vocab().word_id(token);
            log10_sum += self.score_word(&context, id);
            words += 1;
            if window > 0 {
                context.push(id);
                if context.len() > window {
                    context.remove(0);
                }
            }
        }
        (log10_sum, words)
    }

    /// Score a corpus file, one sentence per line, in file order.
    ///
    /// Returns the running `(log10_prob_sum, total_word_count)` — exactly
    /// the element-wise sum of `score_sentence` over the lines.
    pub fn score_corpus(&self, path: impl AsRef<Path>) -> io::Result<(f64, u64)> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let mut log10_sum = 0.0f64;
        let mut words = 0u64;
        let mut sentences = 0u64;
        for line in reader.lines() {
            let (s, w) = self.score_sentence(&line?);
            log10_sum += s;
            words += w;
            sentences += 1;
        }
        tracing::debug!(sentences, words, "scored corpus");
        Ok((log10_sum, words))
    }
}
