//! Token-bounded rendering of the chunks retrieved for one document.
//!
//! Two strategies:
//!
//! - [`SectionBuilder::render_all_sections`] packs every retrieved span in document order.
//! - [`SectionBuilder::render_sections`] centres sections on relevance peaks. A per-character
//!   heatmap sums span scores, contiguous runs above a threshold become peaks, spans are
//!   assigned to their nearest peak, and each kept peak greedily gathers its closest spans
//!   under the token budget.
//!
//! Positions are character offsets into the document text, `end_pos` inclusive.

use serde::Serialize;
use std::cmp::Ordering;
use vectra_text_chunker::Tokenizer;

/// Inserted between two accepted spans that are not adjacent in the document
pub const SECTION_CONNECTOR: &str = "\n\n...\n\n";

const HEAT_THRESHOLD: f32 = 0.1;
/// Budget left over after assembly must exceed this before surrounding text is pulled in
const MIN_EXPANSION_TOKENS: usize = 40;

/// A scored character span of a document
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredSpan {
    pub start_pos: usize,
    pub end_pos: usize,
    pub score: f32,
    pub is_bm25: bool,
}

/// Rendered output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub text: String,
    pub token_count: usize,
    pub score: f32,
    pub is_bm25: bool,
}

#[derive(Debug, Clone, Copy)]
struct Peak {
    pos: usize,
    heat: f32,
}

#[derive(Default)]
struct SectionAccumulator {
    text: String,
    token_count: usize,
    score_sum: f32,
    pieces: usize,
}

impl SectionAccumulator {
    fn push(&mut self, text: &str, token_count: usize, score: f32) {
        self.text.push_str(text);
        self.token_count += token_count;
        self.score_sum += score;
        self.pieces += 1;
    }

    fn finish(self, is_bm25: bool) -> Section {
        Section {
            text: self.text,
            token_count: self.token_count,
            score: self.score_sum / self.pieces.max(1) as f32,
            is_bm25,
        }
    }
}

pub struct SectionBuilder<'a> {
    text: &'a str,
    /// Byte offset of every char, plus `text.len()`
    offsets: Vec<usize>,
    tokenizer: &'a dyn Tokenizer,
}

impl<'a> SectionBuilder<'a> {
    pub fn new(text: &'a str, tokenizer: &'a dyn Tokenizer) -> Self {
        let mut offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        offsets.push(text.len());
        Self {
            text,
            offsets,
            tokenizer,
        }
    }

    fn char_len(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Chars `start..end`, clamped to the text.
    fn slice(&self, start: usize, end: usize) -> &'a str {
        let len = self.char_len();
        let start = start.min(len);
        let end = end.clamp(start, len);
        &self.text[self.offsets[start]..self.offsets[end]]
    }

    fn span_text(&self, span: &ScoredSpan) -> &'a str {
        self.slice(span.start_pos, span.end_pos.saturating_add(1))
    }

    /// Pack spans in document order, splitting any span longer than `max_tokens`.
    ///
    /// Each section's score is the mean of the pieces it holds.
    pub fn render_all_sections(&self, spans: &[ScoredSpan], max_tokens: usize) -> Vec<Section> {
        if max_tokens == 0 {
            return Vec::new();
        }

        let mut ordered: Vec<&ScoredSpan> = spans.iter().collect();
        ordered.sort_by_key(|span| span.start_pos);

        let mut pieces: Vec<(String, usize, f32)> = Vec::new();
        for span in ordered {
            let text = self.span_text(span);
            let tokens = self.tokenizer.encode(text);
            if tokens.len() <= max_tokens {
                pieces.push((text.to_string(), tokens.len(), span.score));
            } else {
                for part in tokens.chunks(max_tokens) {
                    pieces.push((self.tokenizer.decode(part), part.len(), span.score));
                }
            }
        }

        let mut sections = Vec::new();
        let mut current = SectionAccumulator::default();
        for (text, token_count, score) in pieces {
            if current.pieces > 0 && current.token_count + token_count > max_tokens {
                sections.push(std::mem::take(&mut current).finish(false));
            }
            current.push(&text, token_count, score);
        }
        if current.pieces > 0 {
            sections.push(current.finish(false));
        }
        sections
    }

    /// Relevance-centred sections, semantic spans first and keyword spans after.
    ///
    /// A document that fits in `max_tokens` is returned whole with a score of `1.0`.
    pub fn render_sections(
        &self,
        spans: &[ScoredSpan],
        max_tokens: usize,
        max_sections: usize,
        overlapping_chunks: bool,
    ) -> Vec<Section> {
        let doc_tokens = self.tokenizer.count(self.text);
        if doc_tokens <= max_tokens {
            return vec![Section {
                text: self.text.to_string(),
                token_count: doc_tokens,
                score: 1.0,
                is_bm25: false,
            }];
        }

        let (keyword, semantic): (Vec<ScoredSpan>, Vec<ScoredSpan>) =
            spans.iter().copied().partition(|span| span.is_bm25);

        let mut sections =
            self.render_branch(&semantic, max_tokens, max_sections, overlapping_chunks, false);
        sections.extend(self.render_branch(
            &keyword,
            max_tokens,
            max_sections,
            overlapping_chunks,
            true,
        ));
        sections
    }

    fn render_branch(
        &self,
        spans: &[ScoredSpan],
        max_tokens: usize,
        max_sections: usize,
        overlapping_chunks: bool,
        is_bm25: bool,
    ) -> Vec<Section> {
        let Some(best) = best_span(spans) else {
            return Vec::new();
        };

        let mut peaks = self.find_peaks(spans);
        if peaks.is_empty() {
            peaks.push(Peak {
                pos: midpoint(best) as usize,
                heat: best.score,
            });
        }

        let mut assigned: Vec<Vec<ScoredSpan>> = vec![Vec::new(); peaks.len()];
        for span in spans {
            let mid = midpoint(span);
            let mut nearest = 0;
            for (idx, peak) in peaks.iter().enumerate() {
                if distance(mid, peak.pos) < distance(mid, peaks[nearest].pos) {
                    nearest = idx;
                }
            }
            assigned[nearest].push(*span);
        }

        let mut ranked: Vec<usize> = (0..peaks.len()).collect();
        ranked.sort_by(|a, b| {
            peaks[*b]
                .heat
                .partial_cmp(&peaks[*a].heat)
                .unwrap_or(Ordering::Equal)
        });
        ranked.truncate(max_sections);

        let mut sections = Vec::new();
        for idx in ranked {
            let peak = peaks[idx];
            let mut candidates = std::mem::take(&mut assigned[idx]);
            if candidates.is_empty() {
                continue;
            }
            candidates.sort_by(|a, b| {
                distance(midpoint(a), peak.pos)
                    .partial_cmp(&distance(midpoint(b), peak.pos))
                    .unwrap_or(Ordering::Equal)
            });

            let mut accepted: Vec<ScoredSpan> = Vec::new();
            for span in candidates {
                if self.tokenizer.count(self.span_text(&span)) > max_tokens {
                    continue;
                }
                accepted.push(span);
                if self.assembled_tokens(&accepted) > max_tokens {
                    accepted.pop();
                }
            }

            if accepted.is_empty() {
                return vec![self.truncated_section(best, max_tokens, is_bm25)];
            }
            sections.push(self.assemble(&accepted, max_tokens, overlapping_chunks, is_bm25));
        }

        if sections.is_empty() {
            return vec![self.truncated_section(best, max_tokens, is_bm25)];
        }
        sections
    }

    /// Contiguous runs of heat >= threshold, each reduced to its hottest position.
    fn find_peaks(&self, spans: &[ScoredSpan]) -> Vec<Peak> {
        let len = self.char_len();
        let mut heat = vec![0.0f32; len];
        for span in spans {
            let end = span.end_pos.saturating_add(1).min(len);
            for value in heat.iter_mut().take(end).skip(span.start_pos) {
                *value += span.score;
            }
        }

        let mut peaks = Vec::new();
        let mut run: Option<Peak> = None;
        for (pos, value) in heat.iter().copied().enumerate() {
            if value >= HEAT_THRESHOLD {
                run = match run {
                    Some(peak) if peak.heat >= value => Some(peak),
                    _ => Some(Peak { pos, heat: value }),
                };
            } else if let Some(peak) = run.take() {
                peaks.push(peak);
            }
        }
        peaks.extend(run);
        peaks
    }

    /// Merge accepted spans into contiguous char ranges (inclusive), in document order.
    fn ranges(spans: &[ScoredSpan]) -> Vec<(usize, usize)> {
        let mut sorted: Vec<(usize, usize)> =
            spans.iter().map(|s| (s.start_pos, s.end_pos)).collect();
        sorted.sort_unstable();

        let mut ranges: Vec<(usize, usize)> = Vec::new();
        for (start, end) in sorted {
            match ranges.last_mut() {
                Some(last) if start <= last.1.saturating_add(1) => last.1 = last.1.max(end),
                _ => ranges.push((start, end)),
            }
        }
        ranges
    }

    fn assembled_tokens(&self, spans: &[ScoredSpan]) -> usize {
        let ranges = Self::ranges(spans);
        let body: usize = ranges
            .iter()
            .map(|(start, end)| self.tokenizer.count(self.slice(*start, end + 1)))
            .sum();
        body + self.tokenizer.count(SECTION_CONNECTOR) * ranges.len().saturating_sub(1)
    }

    fn assemble(
        &self,
        accepted: &[ScoredSpan],
        max_tokens: usize,
        overlapping_chunks: bool,
        is_bm25: bool,
    ) -> Section {
        let ranges = Self::ranges(accepted);
        let mut text = ranges
            .iter()
            .map(|(start, end)| self.slice(*start, end + 1))
            .collect::<Vec<_>>()
            .join(SECTION_CONNECTOR);
        let mut token_count = self.assembled_tokens(accepted);

        let remaining = max_tokens.saturating_sub(token_count);
        if overlapping_chunks && remaining > MIN_EXPANSION_TOKENS {
            let before_budget = remaining.div_ceil(2);
            let after_budget = remaining - before_budget;

            let first = ranges.first().map_or(0, |r| r.0);
            let last = ranges.last().map_or(0, |r| r.1);

            let before = self.tokenizer.encode(self.slice(0, first));
            let take = before_budget.min(before.len());
            if take > 0 {
                let prefix = self.tokenizer.decode(&before[before.len() - take..]);
                text.insert_str(0, &prefix);
                token_count += take;
            }

            let after = self
                .tokenizer
                .encode(self.slice(last.saturating_add(1), self.char_len()));
            let take = after_budget.min(after.len());
            if take > 0 {
                text.push_str(&self.tokenizer.decode(&after[..take]));
                token_count += take;
            }
        }

        let score = accepted.iter().map(|s| s.score).sum::<f32>() / accepted.len() as f32;
        Section {
            text,
            token_count,
            score,
            is_bm25,
        }
    }

    fn truncated_section(&self, span: &ScoredSpan, max_tokens: usize, is_bm25: bool) -> Section {
        let tokens = self.tokenizer.encode(self.span_text(span));
        let kept = &tokens[..tokens.len().min(max_tokens)];
        Section {
            text: self.tokenizer.decode(kept),
            token_count: kept.len(),
            score: span.score,
            is_bm25,
        }
    }
}

/// Highest-scoring span, first one on ties.
fn best_span(spans: &[ScoredSpan]) -> Option<&ScoredSpan> {
    spans
        .iter()
        .reduce(|best, span| if span.score > best.score { span } else { best })
}

fn midpoint(span: &ScoredSpan) -> f64 {
    (span.start_pos + span.end_pos) as f64 / 2.0
}

fn distance(mid: f64, pos: usize) -> f64 {
    (mid - pos as f64).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use vectra_text_chunker::CharTokenizer;

    fn digits(repeat: usize) -> String {
        "0123456789".repeat(repeat)
    }

    fn span(start_pos: usize, end_pos: usize, score: f32) -> ScoredSpan {
        ScoredSpan {
            start_pos,
            end_pos,
            score,
            is_bm25: false,
        }
    }

    #[test]
    fn render_all_splits_long_span_into_budget_pieces() {
        let doc = digits(22);
        let builder = SectionBuilder::new(&doc, &CharTokenizer);
        let sections = builder.render_all_sections(&[span(30, 64, 0.5)], 10);

        let lengths: Vec<usize> = sections.iter().map(|s| s.token_count).collect();
        assert_eq!(lengths, vec![10, 10, 10, 5]);
        assert!(sections.iter().all(|s| s.score == 0.5 && !s.is_bm25));
        let joined: String = sections.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(joined, &doc[30..65]);
    }

    #[test]
    fn render_all_packs_in_document_order_and_averages_scores() {
        let doc = digits(10);
        let builder = SectionBuilder::new(&doc, &CharTokenizer);
        let sections =
            builder.render_all_sections(&[span(20, 24, 0.2), span(0, 4, 0.8), span(50, 59, 0.4)], 10);

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].text, "0123401234");
        assert!((sections[0].score - 0.5).abs() < 1e-6);
        assert_eq!(sections[1].text, "0123456789");
        assert_eq!(sections[1].token_count, 10);
    }

    #[test]
    fn short_document_is_returned_whole() {
        let doc = "a short note";
        let builder = SectionBuilder::new(doc, &CharTokenizer);
        let sections = builder.render_sections(&[span(2, 6, 0.3)], 100, 3, true);
        assert_eq!(
            sections,
            vec![Section {
                text: doc.to_string(),
                token_count: doc.len(),
                score: 1.0,
                is_bm25: false,
            }]
        );
    }

    #[test]
    fn separate_peaks_become_separate_sections() {
        let doc = digits(20);
        let builder = SectionBuilder::new(&doc, &CharTokenizer);
        let spans = [span(10, 19, 0.9), span(100, 109, 0.8)];

        let one = builder.render_sections(&spans, 50, 1, false);
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].text, &doc[10..20]);
        assert_eq!(one[0].score, 0.9);

        let two = builder.render_sections(&spans, 50, 2, false);
        assert_eq!(two.len(), 2);
        assert_eq!(two[1].text, &doc[100..110]);
    }

    #[test]
    fn non_adjacent_spans_are_joined_with_connector_within_budget() {
        let doc = digits(20);
        let builder = SectionBuilder::new(&doc, &CharTokenizer);
        // The whole-document span keeps heat above threshold so everything shares one peak;
        // it is too long to be accepted itself.
        let spans = [span(10, 19, 0.5), span(25, 34, 0.5), span(0, 199, 0.15)];

        let tight = builder.render_sections(&spans, 22, 1, false);
        assert_eq!(tight.len(), 1);
        assert_eq!(tight[0].text, &doc[10..20]);

        let roomy = builder.render_sections(&spans, 27, 1, false);
        assert_eq!(
            roomy[0].text,
            format!("{}{}{}", &doc[10..20], SECTION_CONNECTOR, &doc[25..35])
        );
        assert_eq!(roomy[0].token_count, 27);
        assert!((roomy[0].score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn overlapping_mode_expands_into_surrounding_text() {
        let doc = digits(20);
        let builder = SectionBuilder::new(&doc, &CharTokenizer);
        let sections = builder.render_sections(&[span(100, 109, 0.8)], 60, 1, true);

        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].text, &doc[75..135]);
        assert_eq!(sections[0].token_count, 60);
        assert_eq!(sections[0].score, 0.8);
    }

    #[test]
    fn keyword_sections_follow_semantic_ones() {
        let doc = digits(20);
        let builder = SectionBuilder::new(&doc, &CharTokenizer);
        let keyword = ScoredSpan {
            is_bm25: true,
            ..span(150, 159, 3.0)
        };
        let sections = builder.render_sections(&[keyword, span(10, 19, 0.7)], 50, 2, false);

        assert_eq!(sections.len(), 2);
        assert!(!sections[0].is_bm25);
        assert_eq!(sections[0].text, &doc[10..20]);
        assert!(sections[1].is_bm25);
        assert_eq!(sections[1].text, &doc[150..160]);
    }

    #[test]
    fn zero_sections_falls_back_to_truncated_best_chunk() {
        let doc = digits(20);
        let builder = SectionBuilder::new(&doc, &CharTokenizer);
        let sections = builder.render_sections(&[span(0, 49, 0.9), span(60, 69, 0.4)], 20, 0, true);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].text, &doc[0..20]);
        assert_eq!(sections[0].token_count, 20);
        assert_eq!(sections[0].score, 0.9);
    }

    #[test]
    fn oversized_chunks_fall_back_to_truncation() {
        let doc = digits(20);
        let builder = SectionBuilder::new(&doc, &CharTokenizer);
        let sections = builder.render_sections(&[span(0, 99, 0.6)], 30, 3, false);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].text, &doc[0..30]);
    }

    #[test]
    fn low_scores_use_midpoint_peak() {
        let doc = digits(20);
        let builder = SectionBuilder::new(&doc, &CharTokenizer);
        let sections = builder.render_sections(&[span(40, 49, 0.05)], 30, 1, false);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].text, &doc[40..50]);
    }

    #[test]
    fn multibyte_positions_are_char_offsets() {
        let doc = "héllo wörld ".repeat(10);
        let builder = SectionBuilder::new(&doc, &CharTokenizer);
        let sections = builder.render_all_sections(&[span(0, 4, 1.0)], 10);
        assert_eq!(sections[0].text, "héllo");
    }

    fn arb_spans(len: usize) -> impl Strategy<Value = Vec<ScoredSpan>> {
        prop::collection::vec(
            (0..len, 0..40usize, 0.0f32..1.0, any::<bool>()).prop_map(
                move |(start, width, score, is_bm25)| ScoredSpan {
                    start_pos: start,
                    end_pos: (start + width).min(len - 1),
                    score,
                    is_bm25,
                },
            ),
            1..8,
        )
    }

    proptest! {
        #[test]
        fn sections_never_exceed_budget(
            spans in arb_spans(200),
            max_tokens in 1usize..80,
            max_sections in 0usize..4,
            overlapping in any::<bool>(),
        ) {
            let doc = digits(20);
            let builder = SectionBuilder::new(&doc, &CharTokenizer);
            for section in builder.render_sections(&spans, max_tokens, max_sections, overlapping) {
                prop_assert!(section.token_count <= max_tokens);
                prop_assert_eq!(section.text.chars().count(), section.token_count);
            }
            for section in builder.render_all_sections(&spans, max_tokens) {
                prop_assert!(section.token_count <= max_tokens);
            }
        }

        #[test]
        fn render_all_reconstructs_a_single_span(
            start in 0usize..150,
            width in 0usize..50,
            max_tokens in 1usize..30,
        ) {
            let doc = digits(20);
            let builder = SectionBuilder::new(&doc, &CharTokenizer);
            let end = start + width;
            let sections = builder.render_all_sections(&[span(start, end, 0.5)], max_tokens);
            let joined: String = sections.iter().map(|s| s.text.as_str()).collect();
            prop_assert_eq!(joined, &doc[start..=end]);
        }
    }
}
