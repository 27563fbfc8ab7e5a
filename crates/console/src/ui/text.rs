pub(super) fn display_width(text: &str) -> usize {
    text.chars().count()
}

/// Fits `text` into exactly `width` columns.
pub(super) fn fit_cell(text: &str, width: usize) -> String {
    pad_right(&truncate_with_ellipsis(&single_line(text), width), width)
}

pub(super) fn pad_right(text: &str, width: usize) -> String {
    let mut out = text.to_string();
    let current = display_width(text);
    if current < width {
        out.extend(std::iter::repeat(' ').take(width - current));
    }
    out
}

pub(super) fn truncate_with_ellipsis(text: &str, max_len: usize) -> String {
    if max_len == 0 {
        return String::new();
    }
    let chars = text.chars();
    let count = chars.clone().count();
    if count <= max_len {
        return text.to_string();
    }
    if max_len <= 3 {
        return chars.take(max_len).collect();
    }
    let keep = max_len - 3;
    let mut out: String = chars.take(keep).collect();
    out.push_str("...");
    out
}

/// Backend strings may carry newlines or control characters.
fn single_line(text: &str) -> String {
    text.chars()
        .map(|ch| if ch.is_control() { ' ' } else { ch })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fits_cells_to_width() {
        assert_eq!(fit_cell("o-1", 6), "o-1   ");
        assert_eq!(fit_cell("a very long reason", 8), "a ver...");
        assert_eq!(fit_cell("line\nbreak", 10), "line break");
        assert_eq!(fit_cell("abc", 0), "");
    }
}
