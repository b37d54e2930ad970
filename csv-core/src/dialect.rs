use core::fmt;

/// The quoting style a writer applies to fields.
///
/// Readers only care whether quoting is enabled at all: with
/// `QuoteStyle::None` the quote character is an ordinary character.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum QuoteStyle {
    /// Quote text fields. Numbers and other values are written bare.
    ///
    /// This is the default.
    Minimal,
    /// Quote every field, whatever its type.
    All,
    /// Quote every field that is not numeric.
    ///
    /// Writers treat this like `Minimal`, since text is always quoted and
    /// numbers never are.
    Nonnumeric,
    /// Never quote. The quote character loses its meaning when reading.
    None,
}

impl QuoteStyle {
    /// Returns true when the quote character is significant.
    pub fn is_enabled(&self) -> bool {
        *self != QuoteStyle::None
    }

    /// The conventional upper case name of this style.
    pub fn name(&self) -> &'static str {
        match *self {
            QuoteStyle::Minimal => "QUOTE_MINIMAL",
            QuoteStyle::All => "QUOTE_ALL",
            QuoteStyle::Nonnumeric => "QUOTE_NONNUMERIC",
            QuoteStyle::None => "QUOTE_NONE",
        }
    }
}

impl Default for QuoteStyle {
    fn default() -> QuoteStyle {
        QuoteStyle::Minimal
    }
}

impl fmt::Display for QuoteStyle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The reason a set of dialect rules was rejected.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DialectError {
    /// The delimiter is the NUL character.
    DelimiterNotSet,
    /// Quoting is enabled but the quote character is NUL.
    QuoteNotSet,
    /// The line terminator is empty.
    LineTerminatorNotSet,
}

impl fmt::Display for DialectError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DialectError::DelimiterNotSet => {
                write!(f, "delimiter must be set")
            }
            DialectError::QuoteNotSet => {
                write!(f, "quote character must be set if quoting is enabled")
            }
            DialectError::LineTerminatorNotSet => {
                write!(f, "line terminator must be set")
            }
        }
    }
}

impl std::error::Error for DialectError {}

/// The rules used to read and write one flavor of delimited text.
///
/// A `Dialect` is validated when it is built and cannot be changed
/// afterwards, so every reader and writer holding one may assume it is
/// well formed. Use [`DialectBuilder`] to change only a few of the defaults.
///
/// The default dialect uses `,` as the delimiter, `"` as the quote character,
/// doubles quotes inside quoted fields, has no escape character and writes
/// `\r\n` after every record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Dialect {
    double_quote: bool,
    delimiter: char,
    quote: char,
    escape: char,
    skip_initial_space: bool,
    line_terminator: String,
    quoting: QuoteStyle,
    strict: bool,
    has_header: bool,
}

impl Dialect {
    /// Build a dialect from every one of its rules.
    ///
    /// An `escape` of `'\0'` disables escape processing, and a `quote` of
    /// `'\0'` is only accepted together with `QuoteStyle::None`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        double_quote: bool,
        delimiter: char,
        quote: char,
        escape: char,
        skip_initial_space: bool,
        line_terminator: &str,
        quoting: QuoteStyle,
        strict: bool,
        has_header: bool,
    ) -> Result<Dialect, DialectError> {
        let dialect = Dialect {
            double_quote,
            delimiter,
            quote,
            escape,
            skip_initial_space,
            line_terminator: line_terminator.to_string(),
            quoting,
            strict,
            has_header,
        };
        dialect.validate()?;
        Ok(dialect)
    }

    /// Check the invariants every dialect must satisfy.
    pub fn validate(&self) -> Result<(), DialectError> {
        if self.delimiter == '\0' {
            return Err(DialectError::DelimiterNotSet);
        }
        if self.quoting.is_enabled() && self.quote == '\0' {
            return Err(DialectError::QuoteNotSet);
        }
        if self.line_terminator.is_empty() {
            return Err(DialectError::LineTerminatorNotSet);
        }
        Ok(())
    }

    /// Whether a quote inside a quoted field is written as two quotes.
    pub fn double_quote(&self) -> bool {
        self.double_quote
    }

    /// The field separator.
    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// The quote character. This is `'\0'` only when quoting is disabled.
    pub fn quote(&self) -> char {
        self.quote
    }

    /// The escape character, if escape processing is enabled.
    pub fn escape(&self) -> Option<char> {
        if self.escape == '\0' {
            None
        } else {
            Some(self.escape)
        }
    }

    /// Whether whitespace right after a delimiter is ignored.
    pub fn skip_initial_space(&self) -> bool {
        self.skip_initial_space
    }

    /// The text written after every record.
    pub fn line_terminator(&self) -> &str {
        &self.line_terminator
    }

    /// When writers quote fields.
    pub fn quoting(&self) -> QuoteStyle {
        self.quoting
    }

    /// Whether malformed quoting is an error instead of being recovered.
    pub fn strict(&self) -> bool {
        self.strict
    }

    /// Whether the first record is a header row.
    pub fn has_header(&self) -> bool {
        self.has_header
    }

    /// Returns a builder seeded with this dialect's rules.
    pub fn to_builder(&self) -> DialectBuilder {
        DialectBuilder { dialect: self.clone() }
    }
}

impl Default for Dialect {
    fn default() -> Dialect {
        Dialect {
            double_quote: true,
            delimiter: ',',
            quote: '"',
            escape: '\0',
            skip_initial_space: false,
            line_terminator: "\r\n".to_string(),
            quoting: QuoteStyle::Minimal,
            strict: false,
            has_header: false,
        }
    }
}

/// Builds a [`Dialect`] one rule at a time.
///
/// Every rule starts at the value used by `Dialect::default()`. Nothing is
/// checked until [`DialectBuilder::build`] is called.
///
/// # Example
///
/// ```
/// use libcsv_core::{DialectBuilder, QuoteStyle};
///
/// let dialect = DialectBuilder::new()
///     .delimiter(';')
///     .quoting(QuoteStyle::All)
///     .has_header(true)
///     .build()
///     .unwrap();
/// assert_eq!(';', dialect.delimiter());
/// ```
#[derive(Clone, Debug, Default)]
pub struct DialectBuilder {
    dialect: Dialect,
}

impl DialectBuilder {
    /// Create a builder holding the default rules.
    pub fn new() -> DialectBuilder {
        DialectBuilder::default()
    }

    /// Validate the rules and produce a dialect.
    pub fn build(&self) -> Result<Dialect, DialectError> {
        self.dialect.validate()?;
        Ok(self.dialect.clone())
    }

    /// Represent a quote inside a quoted field by doubling it.
    ///
    /// This is enabled by default.
    pub fn double_quote(&mut self, yes: bool) -> &mut DialectBuilder {
        self.dialect.double_quote = yes;
        self
    }

    /// The field separator. The default is `,`.
    pub fn delimiter(&mut self, delimiter: char) -> &mut DialectBuilder {
        self.dialect.delimiter = delimiter;
        self
    }

    /// The quote character. The default is `"`.
    pub fn quote(&mut self, quote: char) -> &mut DialectBuilder {
        self.dialect.quote = quote;
        self
    }

    /// The escape character. `None` disables escapes, which is the default.
    pub fn escape(&mut self, escape: Option<char>) -> &mut DialectBuilder {
        self.dialect.escape = escape.unwrap_or('\0');
        self
    }

    /// Ignore whitespace right after a delimiter.
    pub fn skip_initial_space(&mut self, yes: bool) -> &mut DialectBuilder {
        self.dialect.skip_initial_space = yes;
        self
    }

    /// The text written after every record. The default is `\r\n`.
    pub fn line_terminator(&mut self, term: &str) -> &mut DialectBuilder {
        self.dialect.line_terminator = term.to_string();
        self
    }

    /// When writers quote fields. The default is `QuoteStyle::Minimal`.
    pub fn quoting(&mut self, style: QuoteStyle) -> &mut DialectBuilder {
        self.dialect.quoting = style;
        self
    }

    /// Report malformed quoting as an error.
    pub fn strict(&mut self, yes: bool) -> &mut DialectBuilder {
        self.dialect.strict = yes;
        self
    }

    /// Treat the first record as a header row.
    pub fn has_header(&mut self, yes: bool) -> &mut DialectBuilder {
        self.dialect.has_header = yes;
        self
    }
}
