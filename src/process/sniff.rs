use anyhow::{anyhow, Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// UTF-8, with a leading byte-order mark stripped when present.
    Utf8Bom,
    /// Strict UTF-8, BOM kept as data.
    Utf8,
    Latin1,
}

impl Encoding {
    pub fn as_str(&self) -> &str {
        match self {
            Encoding::Utf8Bom => "utf-8-sig",
            Encoding::Utf8 => "utf-8",
            Encoding::Latin1 => "latin-1",
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        match self {
            Encoding::Utf8Bom => {
                let text = std::str::from_utf8(bytes).context("invalid utf-8")?;
                Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_string())
            }
            Encoding::Utf8 => Ok(std::str::from_utf8(bytes)
                .context("invalid utf-8")?
                .to_string()),
            // every byte maps to the code point of the same value
            Encoding::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

/// How one parse attempt decodes and splits a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Sniffed(Encoding),
    Fixed(Encoding, u8),
}

pub const FALLBACK_ENCODINGS: [Encoding; 3] = [Encoding::Utf8Bom, Encoding::Utf8, Encoding::Latin1];
pub const FALLBACK_DELIMITERS: [u8; 3] = [b';', b',', b'\t'];

/// The last-chance attempt whose error is reported to the caller.
pub const FINAL_STRATEGY: Strategy = Strategy::Fixed(Encoding::Utf8, b',');

const SNIFF_CANDIDATES: [u8; 4] = [b';', b',', b'\t', b'|'];
const SNIFF_LINES: usize = 20;

/// Ordered list of guarded attempts: auto-detection first, then every
/// encoding × delimiter combination.
pub fn strategies() -> Vec<Strategy> {
    let mut out = vec![Strategy::Sniffed(Encoding::Utf8Bom)];
    for enc in FALLBACK_ENCODINGS {
        for delim in FALLBACK_DELIMITERS {
            out.push(Strategy::Fixed(enc, delim));
        }
    }
    out
}

impl Strategy {
    /// Decode `bytes` and settle the delimiter.
    pub fn prepare(&self, bytes: &[u8]) -> Result<(String, u8)> {
        match *self {
            Strategy::Sniffed(enc) => {
                let text = enc.decode(bytes)?;
                let delim = sniff_delimiter(&text)
                    .ok_or_else(|| anyhow!("could not determine delimiter"))?;
                Ok((text, delim))
            }
            Strategy::Fixed(enc, delim) => Ok((enc.decode(bytes)?, delim)),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Strategy::Sniffed(enc) => format!("auto delimiter, {}", enc.as_str()),
            Strategy::Fixed(enc, d) => format!("{:?} delimiter, {}", *d as char, enc.as_str()),
        }
    }
}

/// Count `delim` outside double-quoted sections.
fn count_unquoted(line: &str, delim: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for b in line.bytes() {
        if b == b'"' {
            in_quotes = !in_quotes;
        } else if b == delim && !in_quotes {
            count += 1;
        }
    }
    count
}

/// Pick the delimiter that appears the same non-zero number of times on every
/// sampled line. The most frequent consistent candidate wins; ties go to the
/// earlier candidate.
pub fn sniff_delimiter(text: &str) -> Option<u8> {
    let lines: Vec<&str> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();
    if lines.is_empty() {
        return None;
    }

    let mut best: Option<(u8, usize)> = None;
    for delim in SNIFF_CANDIDATES {
        let first = count_unquoted(lines[0], delim);
        if first == 0 {
            continue;
        }
        if lines.iter().all(|l| count_unquoted(l, delim) == first) {
            match best {
                Some((_, n)) if n >= first => {}
                _ => best = Some((delim, first)),
            }
        }
    }
    best.map(|(d, _)| d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_semicolons_over_decimal_commas() {
        let text = "id;valeur;surface\n1;\"1 234,5\";40\n2;99,9;12\n";
        assert_eq!(sniff_delimiter(text), Some(b';'));
    }

    #[test]
    fn sniffs_commas_and_tabs() {
        assert_eq!(sniff_delimiter("a,b,c\n1,2,3\n"), Some(b','));
        assert_eq!(sniff_delimiter("a\tb\n1\t2\n"), Some(b'\t'));
    }

    #[test]
    fn ignores_delimiters_inside_quotes() {
        let text = "a,b\n\"x,y\",2\n";
        assert_eq!(sniff_delimiter(text), Some(b','));
    }

    #[test]
    fn no_consistent_delimiter() {
        assert_eq!(sniff_delimiter("onlyone\nvalue\n"), None);
        assert_eq!(sniff_delimiter("a;b\n1;2;3\n"), None);
        assert_eq!(sniff_delimiter(""), None);
    }

    #[test]
    fn decodes_each_encoding() -> Result<()> {
        let bom = b"\xef\xbb\xbfid;x\n";
        assert_eq!(Encoding::Utf8Bom.decode(bom)?, "id;x\n");
        assert!(Encoding::Utf8.decode(bom)?.starts_with('\u{feff}'));

        let latin = b"nom\ns\xe9vign\xe9\n";
        assert!(Encoding::Utf8Bom.decode(latin).is_err());
        assert_eq!(Encoding::Latin1.decode(latin)?, "nom\nsévigné\n");
        Ok(())
    }

    #[test]
    fn strategy_order() {
        let all = strategies();
        assert_eq!(all.len(), 10);
        assert_eq!(all[0], Strategy::Sniffed(Encoding::Utf8Bom));
        assert_eq!(all[1], Strategy::Fixed(Encoding::Utf8Bom, b';'));
        assert_eq!(all[9], Strategy::Fixed(Encoding::Latin1, b'\t'));
    }
}
