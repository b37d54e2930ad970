use crate::dialect::{Dialect, QuoteStyle};

/// Renders single fields according to a dialect.
///
/// Text is quoted whenever quoting is enabled, and every quote or escape
/// character inside it is escaped so that a [`Tokenizer`](crate::Tokenizer)
/// using the same dialect reads back the original text. Non-text values
/// (numbers, booleans and so on) are only quoted under `QuoteStyle::All`.
///
/// Inside quotes, a quote character is written as escape + quote when the
/// dialect has an escape character, and as two quotes otherwise when
/// `double_quote` is enabled. With neither, the quote is written as is and
/// the field will not read back unchanged.
#[derive(Clone, Debug)]
pub struct Quoter {
    quote: char,
    escape: Option<char>,
    double_quote: bool,
    style: QuoteStyle,
}

impl Quoter {
    /// Create a quoter for the given dialect.
    pub fn new(dialect: &Dialect) -> Quoter {
        Quoter {
            quote: dialect.quote(),
            escape: dialect.escape(),
            double_quote: dialect.double_quote(),
            style: dialect.quoting(),
        }
    }

    /// The quoting style in use.
    pub fn style(&self) -> QuoteStyle {
        self.style
    }

    /// Append a text field to `out`.
    pub fn quote_text(&self, field: &str, out: &mut String) {
        if !self.style.is_enabled() {
            out.push_str(field);
            return;
        }
        out.push(self.quote);
        for c in field.chars() {
            if c == self.quote {
                match self.escape {
                    Some(esc) => out.push(esc),
                    None if self.double_quote => out.push(self.quote),
                    None => {}
                }
            } else if Some(c) == self.escape {
                out.push(c);
            }
            out.push(c);
        }
        out.push(self.quote);
    }

    /// Append the string form of a non-text value to `out`.
    pub fn quote_plain(&self, text: &str, out: &mut String) {
        if self.style == QuoteStyle::All {
            out.push(self.quote);
            out.push_str(text);
            out.push(self.quote);
        } else {
            out.push_str(text);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::dialect::{Dialect, DialectBuilder, QuoteStyle};
    use crate::reader::Tokenizer;

    use super::Quoter;

    fn text(dialect: &Dialect, field: &str) -> String {
        let mut out = String::new();
        Quoter::new(dialect).quote_text(field, &mut out);
        out
    }

    fn plain(dialect: &Dialect, field: &str) -> String {
        let mut out = String::new();
        Quoter::new(dialect).quote_plain(field, &mut out);
        out
    }

    #[test]
    fn text_is_quoted() {
        let d = Dialect::default();
        assert_eq!("\"abc\"", text(&d, "abc"));
        assert_eq!("\"\"", text(&d, ""));
        assert_eq!("\"a,b\"", text(&d, "a,b"));
    }

    #[test]
    fn quotes_doubled() {
        let d = Dialect::default();
        assert_eq!("\"1\"\",3\"", text(&d, "1\",3"));
    }

    #[test]
    fn quotes_escaped() {
        let d = DialectBuilder::new().escape(Some('\\')).build().unwrap();
        assert_eq!("\"\\\"\"", text(&d, "\""));
        assert_eq!("\"a\\\\b\"", text(&d, "a\\b"));
    }

    #[test]
    fn quotes_raw_without_double_or_escape() {
        let d = DialectBuilder::new().double_quote(false).build().unwrap();
        assert_eq!("\"a\"b\"", text(&d, "a\"b"));
    }

    #[test]
    fn quoting_none_is_raw() {
        let d = DialectBuilder::new()
            .quoting(QuoteStyle::None)
            .build()
            .unwrap();
        assert_eq!("a\"b", text(&d, "a\"b"));
        assert_eq!("12", plain(&d, "12"));
    }

    #[test]
    fn plain_quoted_only_for_all() {
        let all = DialectBuilder::new().quoting(QuoteStyle::All).build().unwrap();
        assert_eq!("\"1.5\"", plain(&all, "1.5"));
        for style in &[QuoteStyle::Minimal, QuoteStyle::Nonnumeric] {
            let d = DialectBuilder::new().quoting(*style).build().unwrap();
            assert_eq!("1.5", plain(&d, "1.5"));
        }
    }

    #[test]
    fn tokenizer_reads_back() {
        let fields = ["plain", "with,comma", "with\"quote", "back\\slash\\n", ""];
        let dialects = vec![
            Dialect::default(),
            DialectBuilder::new().escape(Some('\\')).build().unwrap(),
            DialectBuilder::new()
                .delimiter(';')
                .quote('\'')
                .escape(Some('\\'))
                .double_quote(false)
                .quoting(QuoteStyle::All)
                .build()
                .unwrap(),
        ];
        for d in &dialects {
            let q = Quoter::new(d);
            let mut line = String::new();
            for (i, f) in fields.iter().enumerate() {
                if i > 0 {
                    line.push(d.delimiter());
                }
                q.quote_text(f, &mut line);
            }
            let got = Tokenizer::new(d).tokenize(&line).unwrap();
            assert_eq!(fields.to_vec(), got, "line {:?}", line);
        }
    }
}
