use core::fmt;
use core::mem;

use crate::dialect::Dialect;

/// The default upper bound on the number of characters in one field.
pub const DEFAULT_FIELD_SIZE_LIMIT: usize = 8000;

/// The initial capacity of the field buffer.
const DEFAULT_FIELD_CAPACITY: usize = 16;

/// A state of the tokenizer.
///
/// The tokenizer consumes exactly one character per transition. Reaching
/// `EndOfRecord` means the record is complete and can be taken out.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParseState {
    /// Nothing of the current record has been seen yet.
    StartOfRecord,
    /// The previous character ended a field.
    StartOfField,
    /// Inside an unquoted field.
    InField,
    /// Inside a quoted field.
    InQuotedField,
    /// The previous character was an escape outside of quotes.
    EscapedCharacter,
    /// The previous character was an escape inside quotes.
    EscapeInQuotedField,
    /// The previous character was a quote inside a quoted field.
    QuoteInQuotedField,
    /// The record is complete.
    EndOfRecord,
}

/// An error that occurs while tokenizing a line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParseError {
    /// The line contains a NUL character.
    NulByte {
        /// The zero based character offset of the NUL in its line.
        column: usize,
    },
    /// Strict mode saw something other than a delimiter or the end of the
    /// line right after a closing quote.
    ExpectedDelimiter {
        /// The delimiter of the dialect in use.
        delimiter: char,
        /// The quote of the dialect in use.
        quote: char,
        /// The zero based character offset of the offending character.
        column: usize,
    },
    /// Strict mode hit the end of the data inside a quoted field.
    UnterminatedQuote,
    /// A field grew past the configured limit.
    FieldTooLarge {
        /// The limit, in characters.
        limit: usize,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ParseError::NulByte { column } => {
                write!(f, "line contains NUL byte (column {})", column)
            }
            ParseError::ExpectedDelimiter { delimiter, quote, column } => {
                write!(
                    f,
                    "'{}' expected after '{}' (column {})",
                    delimiter, quote, column,
                )
            }
            ParseError::UnterminatedQuote => {
                write!(f, "unexpected end of data inside quoted field")
            }
            ParseError::FieldTooLarge { limit } => {
                write!(f, "field larger than field limit ({})", limit)
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// A character level CSV tokenizer.
///
/// A tokenizer turns the characters of one record into its fields. It does
/// no I/O: callers hand it one physical line at a time with
/// [`Tokenizer::feed_line`], and keep handing it lines for as long as it
/// reports the record is still open (a quoted field spanning several lines).
/// [`Tokenizer::finish`] closes a record at the end of the data.
///
/// For the common case of a record that is known to fit on one line, see
/// [`Tokenizer::tokenize`].
///
/// # Escapes
///
/// When the dialect has an escape character, the character following it is
/// taken literally, except that `n`, `r` and `t` stand for a newline, a
/// carriage return and a tab. This holds inside and outside of quotes.
#[derive(Clone, Debug)]
pub struct Tokenizer {
    dialect: Dialect,
    escape: Option<char>,
    state: ParseState,
    /// The field under construction. Cleared, never shrunk, on save.
    field: String,
    /// Length of `field` in characters.
    field_len: usize,
    fields: Vec<String>,
    limit: usize,
    /// Character offset in the current line, for error reporting.
    column: usize,
    /// Characters folded into a field after a closing quote in lenient mode.
    folds: u64,
}

impl Tokenizer {
    /// Create a tokenizer for the given dialect.
    pub fn new(dialect: &Dialect) -> Tokenizer {
        Tokenizer {
            dialect: dialect.clone(),
            escape: dialect.escape(),
            state: ParseState::StartOfRecord,
            field: String::with_capacity(DEFAULT_FIELD_CAPACITY),
            field_len: 0,
            fields: vec![],
            limit: DEFAULT_FIELD_SIZE_LIMIT,
            column: 0,
            folds: 0,
        }
    }

    /// Set the maximum number of characters a single field may hold.
    ///
    /// The default is [`DEFAULT_FIELD_SIZE_LIMIT`].
    pub fn set_field_size_limit(&mut self, limit: usize) {
        self.limit = limit;
    }

    /// The maximum number of characters a single field may hold.
    pub fn field_size_limit(&self) -> usize {
        self.limit
    }

    /// The dialect this tokenizer follows.
    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// The current state.
    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Returns true when a record is complete.
    pub fn is_record_end(&self) -> bool {
        self.state == ParseState::EndOfRecord
    }

    /// The number of characters lenient parsing has folded into fields
    /// after a closing quote since this tokenizer was created.
    pub fn folds(&self) -> u64 {
        self.folds
    }

    /// Discard any partial record and start over.
    pub fn reset(&mut self) {
        self.state = ParseState::StartOfRecord;
        self.field.clear();
        self.field_len = 0;
        self.fields.clear();
        self.column = 0;
    }

    /// Remove the fields of the current record and start a new one.
    pub fn take_record(&mut self) -> Vec<String> {
        let fields = mem::replace(&mut self.fields, vec![]);
        self.reset();
        fields
    }

    /// Tokenize one complete record held in `line`.
    ///
    /// `line` must not contain its line terminator. A quoted field that is
    /// left open at the end of `line` is closed as if the data ended there.
    pub fn tokenize(&mut self, line: &str) -> Result<Vec<String>, ParseError> {
        self.reset();
        self.feed_line(line, "")?;
        Ok(self.take_record())
    }

    /// Feed one physical line of input.
    ///
    /// `ending` is the terminator that followed the line in the input, or
    /// the empty string if the line ended with the data. Returns `true` when
    /// the record is complete and `false` when it continues on the next line.
    /// Inside a quoted field, or right after an escape, the terminator is
    /// kept as part of the field.
    ///
    /// A line containing NUL is rejected whatever the strictness of the
    /// dialect.
    pub fn feed_line(
        &mut self,
        line: &str,
        ending: &str,
    ) -> Result<bool, ParseError> {
        if let Some(column) = line.chars().position(|c| c == '\0') {
            return Err(ParseError::NulByte { column });
        }
        self.column = 0;
        for c in line.chars() {
            self.feed(c)?;
            self.column += 1;
        }
        if ending.is_empty() {
            self.finish()?;
            return Ok(true);
        }
        match self.state {
            ParseState::InQuotedField
            | ParseState::EscapeInQuotedField
            | ParseState::EscapedCharacter => {
                for c in ending.chars() {
                    self.add_char(c)?;
                }
                self.state = match self.state {
                    ParseState::EscapedCharacter => ParseState::InField,
                    _ => ParseState::InQuotedField,
                };
                Ok(false)
            }
            _ => {
                self.feed('\n')?;
                Ok(true)
            }
        }
    }

    /// Close the current record at the end of the data.
    ///
    /// In strict mode an open quoted field is an error. Otherwise whatever
    /// was collected becomes the last field.
    pub fn finish(&mut self) -> Result<(), ParseError> {
        use self::ParseState::*;

        match self.state {
            StartOfRecord | EndOfRecord => {}
            InQuotedField | EscapeInQuotedField if self.dialect.strict() => {
                return Err(ParseError::UnterminatedQuote);
            }
            _ => self.save_field(),
        }
        self.state = EndOfRecord;
        Ok(())
    }

    /// Run one transition of the state machine.
    ///
    /// `\n` and `\r` end the record unless they appear inside a quoted
    /// field. NUL ends the current field without ending the record.
    pub fn feed(&mut self, c: char) -> Result<(), ParseError> {
        use self::ParseState::*;

        let quoting = self.dialect.quoting().is_enabled();
        match self.state {
            StartOfRecord => {
                if c == '\0' {
                } else if is_eol(c) {
                    self.state = EndOfRecord;
                } else {
                    self.state = StartOfField;
                    self.feed(c)?;
                }
            }
            StartOfField => {
                if c == '\0' || is_eol(c) {
                    self.save_field();
                    self.state = end_state(c);
                } else if quoting && c == self.dialect.quote() {
                    self.state = InQuotedField;
                } else if self.escape == Some(c) {
                    self.state = EscapedCharacter;
                } else if self.dialect.skip_initial_space() && c.is_whitespace()
                {
                } else if c == self.dialect.delimiter() {
                    self.save_field();
                } else {
                    self.add_char(c)?;
                    self.state = InField;
                }
            }
            InField => {
                if c == '\0' || is_eol(c) {
                    self.save_field();
                    self.state = end_state(c);
                } else if self.escape == Some(c) {
                    self.state = EscapedCharacter;
                } else if c == self.dialect.delimiter() {
                    self.save_field();
                    self.state = StartOfField;
                } else {
                    self.add_char(c)?;
                }
            }
            EscapedCharacter => {
                self.add_char(unescape(c))?;
                self.state = InField;
            }
            InQuotedField => {
                if c == '\0' {
                } else if self.escape == Some(c) {
                    self.state = EscapeInQuotedField;
                } else if quoting && c == self.dialect.quote() {
                    self.state = if self.dialect.double_quote() {
                        QuoteInQuotedField
                    } else {
                        InField
                    };
                } else {
                    self.add_char(c)?;
                }
            }
            EscapeInQuotedField => {
                self.add_char(unescape(c))?;
                self.state = InQuotedField;
            }
            QuoteInQuotedField => {
                if quoting && c == self.dialect.quote() {
                    self.add_char(c)?;
                    self.state = InQuotedField;
                } else if c == self.dialect.delimiter() {
                    self.save_field();
                    self.state = StartOfField;
                } else if c == '\0' || is_eol(c) {
                    self.save_field();
                    self.state = end_state(c);
                } else if self.dialect.strict() {
                    return Err(ParseError::ExpectedDelimiter {
                        delimiter: self.dialect.delimiter(),
                        quote: self.dialect.quote(),
                        column: self.column,
                    });
                } else {
                    self.folds += 1;
                    self.add_char(c)?;
                    self.state = InField;
                }
            }
            EndOfRecord => {
                if is_eol(c) {
                } else if self.dialect.strict() {
                    return Err(ParseError::ExpectedDelimiter {
                        delimiter: self.dialect.delimiter(),
                        quote: self.dialect.quote(),
                        column: self.column,
                    });
                } else {
                    // Data after the end of a record starts a new field of
                    // the same record rather than being dropped.
                    self.state = StartOfRecord;
                    self.feed(c)?;
                }
            }
        }
        Ok(())
    }

    fn add_char(&mut self, c: char) -> Result<(), ParseError> {
        if self.field_len >= self.limit {
            return Err(ParseError::FieldTooLarge { limit: self.limit });
        }
        self.field.push(c);
        self.field_len += 1;
        Ok(())
    }

    fn save_field(&mut self) {
        self.fields.push(self.field.clone());
        self.field.clear();
        self.field_len = 0;
    }
}

fn is_eol(c: char) -> bool {
    c == '\n' || c == '\r'
}

fn end_state(c: char) -> ParseState {
    if c == '\0' {
        ParseState::StartOfRecord
    } else {
        ParseState::EndOfRecord
    }
}

/// Translate the character following an escape.
fn unescape(c: char) -> char {
    match c {
        '\0' | 'n' => '\n',
        'r' => '\r',
        't' => '\t',
        c => c,
    }
}

#[cfg(test)]
mod tests {
    use crate::dialect::{Dialect, DialectBuilder, QuoteStyle};

    use super::{ParseError, ParseState, Tokenizer};

    type Csv = Vec<Vec<String>>;

    macro_rules! csv {
        ($([$($field:expr),*]),*) => {{
            #[allow(unused_mut)]
            fn x() -> Csv {
                let mut csv: Csv = vec![];
                $(
                    let mut row: Vec<String> = vec![];
                    $(
                        row.push($field.to_string());
                    )*
                    csv.push(row);
                )*
                csv
            }
            x()
        }}
    }

    macro_rules! parses_to {
        ($name:ident, $data:expr, $expected:expr) => {
            parses_to!($name, $data, $expected, |builder| builder);
        };
        ($name:ident, $data:expr, $expected:expr, $config:expr) => {
            #[test]
            fn $name() {
                let mut builder = DialectBuilder::new();
                $config(&mut builder);
                let dialect = builder.build().unwrap();
                let got = parse_lines(&dialect, $data).unwrap();
                let expected = $expected;
                assert_eq!(expected, got);
            }
        };
    }

    /// Split `data` into physical lines the way a line reader would and
    /// drive the tokenizer over them, skipping blank lines.
    fn parse_lines(dialect: &Dialect, data: &str) -> Result<Csv, ParseError> {
        let mut tok = Tokenizer::new(dialect);
        let mut csv = vec![];
        let mut rest = data;
        let mut open = false;
        while !rest.is_empty() {
            let (line, ending, next) = split_line(rest);
            rest = next;
            if !open && line.is_empty() {
                continue;
            }
            if tok.feed_line(line, ending)? {
                csv.push(tok.take_record());
                open = false;
            } else {
                open = true;
            }
        }
        if open {
            tok.finish()?;
            csv.push(tok.take_record());
        }
        Ok(csv)
    }

    fn split_line(data: &str) -> (&str, &str, &str) {
        match data.find(|c| c == '\r' || c == '\n') {
            None => (data, "", ""),
            Some(i) => {
                let end = if data[i..].starts_with("\r\n") { i + 2 } else { i + 1 };
                (&data[..i], &data[i..end], &data[end..])
            }
        }
    }

    fn tokenize(dialect: &Dialect, line: &str) -> Result<Vec<String>, ParseError> {
        Tokenizer::new(dialect).tokenize(line)
    }

    fn escaped(b: &mut DialectBuilder) {
        b.escape(Some('\\'));
    }

    parses_to!(one_row_one_field, "a", csv![["a"]]);
    parses_to!(one_row_many_fields, "a,b,c", csv![["a", "b", "c"]]);
    parses_to!(one_row_trailing_comma, "a,b,", csv![["a", "b", ""]]);
    parses_to!(one_row_one_field_lf, "a\n", csv![["a"]]);
    parses_to!(one_row_many_fields_cr, "a,b,c\r", csv![["a", "b", "c"]]);
    parses_to!(one_row_many_fields_crlf, "a,b,c\r\n", csv![["a", "b", "c"]]);
    parses_to!(many_rows_lf, "a,b\nc,d", csv![["a", "b"], ["c", "d"]]);
    parses_to!(many_rows_crlf, "a,b\r\nc,d\r\n", csv![["a", "b"], ["c", "d"]]);
    parses_to!(empty_fields, ",,", csv![["", "", ""]]);
    parses_to!(empty_input, "", csv![]);
    parses_to!(only_line_endings, "\n\r", csv![]);

    parses_to!(quote_simple, "\"a\",b", csv![["a", "b"]]);
    parses_to!(quote_delimiter, "\"a,b\",c", csv![["a,b", "c"]]);
    parses_to!(quote_doubled, "\"1\"\",3\",5", csv![["1\",3", "5"]]);
    parses_to!(quote_empty, "\"\",a", csv![["", "a"]]);
    parses_to!(
        quote_multiline,
        "\"This is\r\nA multi-line\r\ninput\"",
        csv![["This is\r\nA multi-line\r\ninput"]]
    );
    parses_to!(
        quote_multiline_then_record,
        "\"a\nb\",c\nd,e",
        csv![["a\nb", "c"], ["d", "e"]]
    );
    parses_to!(
        quote_inside_unquoted,
        "a\"b\",c",
        csv![["a\"b\"", "c"]]
    );
    parses_to!(
        quote_lenient_fold,
        "\"ab\"c,d",
        csv![["abc", "d"]]
    );
    parses_to!(
        quote_lenient_no_double,
        "\"ab\"c",
        csv![["abc"]],
        |b: &mut DialectBuilder| { b.double_quote(false); }
    );
    parses_to!(
        quote_disabled,
        "1,\",3,\",5",
        csv![["1", "\"", "3", "\"", "5"]],
        |b: &mut DialectBuilder| { b.quoting(QuoteStyle::None); }
    );
    parses_to!(
        quote_custom,
        "'a,b',c",
        csv![["a,b", "c"]],
        |b: &mut DialectBuilder| { b.quote('\''); }
    );

    parses_to!(
        escape_unquoted_letter,
        "a,\\b,c",
        csv![["a", "b", "c"]],
        escaped
    );
    parses_to!(
        escape_unquoted_delimiter,
        "a,b\\,c",
        csv![["a", "b,c"]],
        escaped
    );
    parses_to!(
        escape_quoted_delimiter,
        "a,\"b\\,c\"",
        csv![["a", "b,c"]],
        escaped
    );
    parses_to!(
        escape_quoted_letter,
        "a,\"b,\\c\"",
        csv![["a", "b,c"]],
        escaped
    );
    parses_to!(
        escape_quoted_quote,
        "a,\"b,c\\\"\"",
        csv![["a", "b,c\""]],
        escaped
    );
    parses_to!(
        escape_after_closing_quote,
        "a,\"b,c\"\\",
        csv![["a", "b,c\\"]],
        escaped
    );
    parses_to!(
        escape_control_letters,
        "a,\"b,c\\n\\t\\r\"\\",
        csv![["a", "b,c\n\t\r\\"]],
        escaped
    );
    parses_to!(
        escape_escape,
        "a\\\\b",
        csv![["a\\b"]],
        escaped
    );
    parses_to!(
        escape_line_ending,
        "a\\\nb,c",
        csv![["a\nb", "c"]],
        escaped
    );
    parses_to!(
        escape_quote_doubling_together,
        "\"1\"\",3\",5",
        csv![["1\",3", "5"]],
        |b: &mut DialectBuilder| {
            b.escape(Some('\\')).quoting(QuoteStyle::All);
        }
    );

    parses_to!(
        skip_space_on,
        " a, b, c",
        csv![["a", "b", "c"]],
        |b: &mut DialectBuilder| { b.skip_initial_space(true); }
    );
    parses_to!(skip_space_off, " a, b, c", csv![[" a", " b", " c"]]);
    parses_to!(
        skip_space_before_quote,
        "a, \"b,c\"",
        csv![["a", "b,c"]],
        |b: &mut DialectBuilder| { b.skip_initial_space(true); }
    );
    parses_to!(
        skip_space_tab_delimiter,
        "a\t\tb",
        csv![["a", "b"]],
        |b: &mut DialectBuilder| { b.delimiter('\t').skip_initial_space(true); }
    );
    parses_to!(
        skip_space_space_delimiter,
        "a  b, c",
        csv![["a", "b,", "c"]],
        |b: &mut DialectBuilder| { b.delimiter(' ').skip_initial_space(true); }
    );

    parses_to!(
        delimiter_semicolon,
        "a;b,c;d",
        csv![["a", "b,c", "d"]],
        |b: &mut DialectBuilder| { b.delimiter(';'); }
    );
    parses_to!(
        delimiter_unicode,
        "α¦\"β¦γ\"¦δ",
        csv![["α", "β¦γ", "δ"]],
        |b: &mut DialectBuilder| { b.delimiter('¦'); }
    );

    #[test]
    fn nul_rejected_in_both_modes() {
        let lenient = Dialect::default();
        let strict = DialectBuilder::new().strict(true).build().unwrap();
        for dialect in &[lenient, strict] {
            let got = tokenize(dialect, "a,b\0c");
            assert_eq!(Err(ParseError::NulByte { column: 3 }), got);
        }
    }

    #[test]
    fn strict_stray_after_quote() {
        let strict = DialectBuilder::new().strict(true).build().unwrap();
        let err = tokenize(&strict, "\"ab\"c").unwrap_err();
        assert_eq!(
            ParseError::ExpectedDelimiter {
                delimiter: ',',
                quote: '"',
                column: 4,
            },
            err
        );
        assert!(err.to_string().starts_with("',' expected after '\"'"));
    }

    #[test]
    fn strict_unterminated_quote() {
        let strict = DialectBuilder::new().strict(true).build().unwrap();
        let got = tokenize(&strict, "a,\"bc");
        assert_eq!(Err(ParseError::UnterminatedQuote), got);

        let lenient = Dialect::default();
        let got = tokenize(&lenient, "a,\"bc").unwrap();
        assert_eq!(vec!["a", "bc"], got);
    }

    #[test]
    fn field_limit() {
        let mut tok = Tokenizer::new(&Dialect::default());
        tok.set_field_size_limit(4);
        assert_eq!(vec!["abcd", "e"], tok.tokenize("abcd,e").unwrap());
        assert_eq!(
            Err(ParseError::FieldTooLarge { limit: 4 }),
            tok.tokenize("abcde")
        );
    }

    #[test]
    fn field_limit_default() {
        let dialect = Dialect::default();
        let long = "x".repeat(super::DEFAULT_FIELD_SIZE_LIMIT);
        assert_eq!(vec![long.clone()], tokenize(&dialect, &long).unwrap());

        let longer = format!("{}y", long);
        assert_eq!(
            Err(ParseError::FieldTooLarge { limit: 8000 }),
            tokenize(&dialect, &longer)
        );
    }

    #[test]
    fn states_one_char_at_a_time() {
        let mut tok = Tokenizer::new(&Dialect::default());
        assert_eq!(ParseState::StartOfRecord, tok.state());
        tok.feed('"').unwrap();
        assert_eq!(ParseState::InQuotedField, tok.state());
        tok.feed('a').unwrap();
        assert_eq!(ParseState::InQuotedField, tok.state());
        tok.feed('"').unwrap();
        assert_eq!(ParseState::QuoteInQuotedField, tok.state());
        tok.feed(',').unwrap();
        assert_eq!(ParseState::StartOfField, tok.state());
        tok.feed('b').unwrap();
        assert_eq!(ParseState::InField, tok.state());
        tok.feed('\r').unwrap();
        assert!(tok.is_record_end());
        assert_eq!(vec!["a", "b"], tok.take_record());
        assert_eq!(ParseState::StartOfRecord, tok.state());
    }

    #[test]
    fn nul_ends_field_not_record() {
        let mut tok = Tokenizer::new(&Dialect::default());
        for c in "a\0b".chars() {
            tok.feed(c).unwrap();
        }
        tok.finish().unwrap();
        assert_eq!(vec!["a", "b"], tok.take_record());
    }

    #[test]
    fn data_after_record_end() {
        let mut tok = Tokenizer::new(&Dialect::default());
        for c in "a\nb".chars() {
            tok.feed(c).unwrap();
        }
        tok.finish().unwrap();
        assert_eq!(vec!["a", "b"], tok.take_record());

        let strict = DialectBuilder::new().strict(true).build().unwrap();
        let mut tok = Tokenizer::new(&strict);
        tok.feed('a').unwrap();
        tok.feed('\n').unwrap();
        assert!(tok.feed('b').is_err());
    }

    #[test]
    fn lenient_folds_are_counted() {
        let mut tok = Tokenizer::new(&Dialect::default());
        tok.tokenize("\"a\"b,\"c\"d").unwrap();
        assert_eq!(2, tok.folds());
    }

    #[test]
    fn records_are_independent() {
        let mut tok = Tokenizer::new(&Dialect::default());
        let first = tok.tokenize("a,b").unwrap();
        let second = tok.tokenize("c").unwrap();
        assert_eq!(vec!["a", "b"], first);
        assert_eq!(vec!["c"], second);
    }
}
