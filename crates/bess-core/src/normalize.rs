//! Text normalization for German municipal-planning text.
//!
//! Lowercases, folds umlauts, and collapses whitespace, while keeping an offset
//! map back to the original text so evidence snippets can be sliced from the
//! un-normalized source with correct boundaries.

/// Maps each `char` of the normalized output to the byte offset of the source
/// `char` in the original text that produced it.
pub type OffsetMap = Vec<usize>;

/// Result of [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub text: String,
    pub offsets: OffsetMap,
}

impl Normalized {
    /// Map a char-index range in the normalized text back to a byte range in
    /// `original`. Used to slice evidence snippets from the un-normalized source.
    pub fn original_byte_range(&self, original: &str, norm_char_range: std::ops::Range<usize>) -> std::ops::Range<usize> {
        if self.offsets.is_empty() || norm_char_range.start >= self.offsets.len() {
            return 0..0;
        }
        let start = self.offsets[norm_char_range.start];
        let end_idx = norm_char_range.end.saturating_sub(1).min(self.offsets.len() - 1);
        let end_char_offset = self.offsets[end_idx];
        let end = original[end_char_offset..]
            .chars()
            .next()
            .map(|c| end_char_offset + c.len_utf8())
            .unwrap_or(original.len());
        start..end.max(start)
    }
}

/// Normalize `text`: lowercase, fold umlauts (ä→ae, ö→oe, ü→ue, ß→ss), and
/// collapse runs of whitespace (including newlines) to a single space.
///
/// Idempotent: `normalize(normalize(text).text).text == normalize(text).text`.
pub fn normalize(text: &str) -> Normalized {
    let mut out = String::with_capacity(text.len());
    let mut offsets = OffsetMap::with_capacity(text.len());
    let mut pending_space: Option<usize> = None;

    for (idx, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if pending_space.is_none() && !out.is_empty() {
                pending_space = Some(idx);
            }
            continue;
        }

        if let Some(space_idx) = pending_space.take() {
            out.push(' ');
            offsets.push(space_idx);
        }

        for lowered in ch.to_lowercase() {
            match lowered {
                'ä' => push_fold(&mut out, &mut offsets, "ae", idx),
                'ö' => push_fold(&mut out, &mut offsets, "oe", idx),
                'ü' => push_fold(&mut out, &mut offsets, "ue", idx),
                'ß' => push_fold(&mut out, &mut offsets, "ss", idx),
                other => {
                    out.push(other);
                    offsets.push(idx);
                }
            }
        }
    }

    Normalized { text: out, offsets }
}

fn push_fold(out: &mut String, offsets: &mut OffsetMap, folded: &str, source_idx: usize) {
    for c in folded.chars() {
        out.push(c);
        offsets.push(source_idx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_folds_umlauts() {
        let n = normalize("Batteriespeicher für Übergangslösung");
        assert_eq!(n.text, "batteriespeicher fuer uebergangsloesung");
    }

    #[test]
    fn folds_eszett() {
        let n = normalize("Straße");
        assert_eq!(n.text, "strasse");
    }

    #[test]
    fn collapses_whitespace_runs_including_newlines() {
        let n = normalize("Bebauungsplan   Nr.\n\n12/2024");
        assert_eq!(n.text, "bebauungsplan nr. 12/2024");
    }

    #[test]
    fn idempotent() {
        let once = normalize("Batteriespeicheranlage  Metzdorf");
        let twice = normalize(&once.text);
        assert_eq!(once.text, twice.text);
    }

    #[test]
    fn offsets_recover_original_slice() {
        let original = "Die Batteriespeicheranlage Metzdorf";
        let n = normalize(original);
        let needle = "batteriespeicheranlage";
        let start = n.text.find(needle).unwrap();
        let char_start = n.text[..start].chars().count();
        let char_end = char_start + needle.chars().count();
        let range = n.original_byte_range(original, char_start..char_end);
        assert_eq!(&original[range], "Batteriespeicheranlage");
    }

    #[test]
    fn trims_leading_and_trailing_whitespace() {
        let n = normalize("   hallo welt   ");
        assert_eq!(n.text, "hallo welt");
    }
}
