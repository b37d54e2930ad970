use memchr::memchr2;

/// The terminator that ended a physical line.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LineEnding {
    /// `\n`
    Lf,
    /// `\r`
    Cr,
    /// `\r\n`
    CrLf,
}

impl LineEnding {
    /// The terminator as text.
    pub fn as_str(&self) -> &'static str {
        match *self {
            LineEnding::Lf => "\n",
            LineEnding::Cr => "\r",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// The result of framing some input.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FrameResult {
    /// All of the input was consumed without completing a line. The caller
    /// should provide more input, or an empty slice at the end of the data.
    InputEmpty,
    /// A complete line has been copied to the output buffer.
    ///
    /// `ending` is `None` for a final line that ran up to the end of the
    /// data.
    Line {
        /// The terminator that ended the line.
        ending: Option<LineEnding>,
    },
    /// The end of the data was reached and there are no more lines.
    End,
}

/// Splits a byte stream into physical lines.
///
/// `\n`, `\r` and `\r\n` each end a line. The framer is push based: give it
/// whatever input is at hand with [`LineFramer::frame`], and it tells you how
/// much it consumed and whether a line is ready. Line bytes, without their
/// terminator, are appended to the caller's output buffer, which the caller
/// clears between lines. Signal the end of the data with an empty input.
///
/// A `\r` that is the last byte of one chunk is held until the next call so
/// that a `\r\n` split across chunks is still a single terminator.
///
/// Framing knows nothing of quotes. A record whose quoted field spans lines
/// is reassembled by feeding consecutive lines to a
/// [`Tokenizer`](crate::Tokenizer).
#[derive(Clone, Debug, Default)]
pub struct LineFramer {
    /// A `\r` ended the previous chunk.
    pending_cr: bool,
    /// Bytes of an unfinished line have been written to the output.
    partial: bool,
    /// Number of lines produced so far.
    lines: u64,
}

impl LineFramer {
    /// Create a new framer.
    pub fn new() -> LineFramer {
        LineFramer::default()
    }

    /// Forget any partial line and restart the line count.
    pub fn reset(&mut self) {
        *self = LineFramer::default();
    }

    /// The number of lines returned so far.
    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Frame the given input.
    ///
    /// Returns the result and the number of input bytes consumed.
    pub fn frame(
        &mut self,
        input: &[u8],
        output: &mut Vec<u8>,
    ) -> (FrameResult, usize) {
        if self.pending_cr {
            self.pending_cr = false;
            let (ending, nin) = if input.first() == Some(&b'\n') {
                (LineEnding::CrLf, 1)
            } else {
                (LineEnding::Cr, 0)
            };
            return (self.line(Some(ending)), nin);
        }
        if input.is_empty() {
            if self.partial {
                return (self.line(None), 0);
            }
            return (FrameResult::End, 0);
        }
        let i = match memchr2(b'\n', b'\r', input) {
            None => {
                output.extend_from_slice(input);
                self.partial = true;
                return (FrameResult::InputEmpty, input.len());
            }
            Some(i) => i,
        };
        output.extend_from_slice(&input[..i]);
        if input[i] == b'\n' {
            return (self.line(Some(LineEnding::Lf)), i + 1);
        }
        match input.get(i + 1) {
            Some(&b'\n') => (self.line(Some(LineEnding::CrLf)), i + 2),
            Some(_) => (self.line(Some(LineEnding::Cr)), i + 1),
            None => {
                self.pending_cr = true;
                self.partial = true;
                (FrameResult::InputEmpty, i + 1)
            }
        }
    }

    fn line(&mut self, ending: Option<LineEnding>) -> FrameResult {
        self.partial = false;
        self.lines += 1;
        FrameResult::Line { ending }
    }
}
