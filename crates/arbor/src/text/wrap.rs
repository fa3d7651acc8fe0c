use unicode_segmentation::UnicodeSegmentation;

use super::TextMeasure;

/// Wrap text to `max_width` pixels. Explicit newlines always break. Words
/// wider than a line are broken between graphemes. Trailing whitespace is
/// dropped from each line.
pub fn wrap(
    measure: &mut dyn TextMeasure,
    text: &str,
    size: f32,
    max_width: Option<f32>,
) -> Vec<String> {
    let mut out = Vec::new();
    for para in text.split('\n') {
        let Some(max) = max_width else {
            out.push(para.trim_end().to_string());
            continue;
        };
        let mut line = String::new();
        let mut width = 0.0;
        for word in para.split_word_bounds() {
            let w = measure.measure(word, size);
            let blank = word.trim().is_empty();
            if width + w <= max || (line.is_empty() && blank) {
                line.push_str(word);
                width += w;
                continue;
            }
            if blank {
                // Break here; whitespace never starts a line.
                out.push(line.trim_end().to_string());
                line.clear();
                width = 0.0;
                continue;
            }
            if !line.trim().is_empty() {
                out.push(line.trim_end().to_string());
                line.clear();
                width = 0.0;
            }
            for g in word.graphemes(true) {
                let gw = measure.measure(g, size);
                if width + gw > max && !line.is_empty() {
                    out.push(line.trim_end().to_string());
                    line.clear();
                    width = 0.0;
                }
                line.push_str(g);
                width += gw;
            }
        }
        out.push(line.trim_end().to_string());
    }
    out
}
