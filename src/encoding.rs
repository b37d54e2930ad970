//! Text encoding support for readers and writers, using `encoding_rs`.
//!
//! Everything inside the crate works on UTF-8. A source in another encoding
//! is decoded on the fly by [`DecodeReader`], and a sink in another encoding
//! is fed through [`EncodeWriter`].

use std::cmp;
use std::fs;
use std::io;
use std::path::Path;
use std::str;

use encoding_rs::{CoderResult, Decoder, Encoder, EncoderResult, Encoding};
use log::debug;

use crate::error::{Error, Result};

const BUF_SIZE: usize = 8 * (1 << 10);

/// Check if the data starts with a UTF-8 BOM.
pub(crate) fn has_utf8_bom(data: &[u8]) -> bool {
    data.starts_with(b"\xEF\xBB\xBF")
}

/// Resolve a WHATWG encoding label such as `"utf-8"` or `"latin1"`.
pub fn lookup(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| Error::UnknownEncoding(label.to_string()))
}

/// Returns true when no transcoding is needed for the encoding.
pub(crate) fn is_utf8(encoding: Option<&'static Encoding>) -> bool {
    encoding.map_or(true, |e| e == encoding_rs::UTF_8)
}

/// Returns true when a path names nothing at all.
fn is_blank(path: &Path) -> bool {
    path.to_string_lossy().trim().is_empty()
}

/// Open a file for reading, translating failures to crate errors.
pub(crate) fn open_source(path: &Path) -> Result<fs::File> {
    if is_blank(path) {
        return Err(Error::NoInputSource);
    }
    match fs::File::open(path) {
        Ok(file) => {
            debug!("opened {} for reading", path.display());
            Ok(file)
        }
        Err(err) => {
            Err(Error::CannotOpenSource { path: path.to_path_buf(), err })
        }
    }
}

/// Open an existing file for writing, truncating it.
///
/// Missing files are not created.
pub(crate) fn open_sink(path: &Path) -> Result<fs::File> {
    if is_blank(path) {
        return Err(Error::NoOutputSink);
    }
    let res = fs::OpenOptions::new().write(true).truncate(true).open(path);
    match res {
        Ok(file) => {
            debug!("opened {} for writing", path.display());
            Ok(file)
        }
        Err(err) => Err(Error::CannotOpenSink { path: path.to_path_buf(), err }),
    }
}

/// An `io::Read` adapter that decodes its source into UTF-8.
///
/// A byte order mark at the start of the source overrides the declared
/// encoding and is removed. Malformed sequences become U+FFFD.
pub struct DecodeReader<R> {
    rdr: R,
    decoder: Decoder,
    inbuf: Vec<u8>,
    inpos: usize,
    inlen: usize,
    outbuf: Vec<u8>,
    outpos: usize,
    outlen: usize,
    eof: bool,
    done: bool,
}

impl<R: io::Read> DecodeReader<R> {
    /// Decode `rdr` from `encoding`.
    pub fn new(rdr: R, encoding: &'static Encoding) -> DecodeReader<R> {
        DecodeReader {
            rdr,
            decoder: encoding.new_decoder(),
            inbuf: vec![0; BUF_SIZE],
            inpos: 0,
            inlen: 0,
            outbuf: vec![0; BUF_SIZE],
            outpos: 0,
            outlen: 0,
            eof: false,
            done: false,
        }
    }

    /// Unwrap the source.
    pub fn into_inner(self) -> R {
        self.rdr
    }

    fn decode_more(&mut self) -> io::Result<()> {
        if self.inpos == self.inlen && !self.eof {
            self.inlen = self.rdr.read(&mut self.inbuf)?;
            self.inpos = 0;
            self.eof = self.inlen == 0;
        }
        let (res, nin, nout, _) = self.decoder.decode_to_utf8(
            &self.inbuf[self.inpos..self.inlen],
            &mut self.outbuf,
            self.eof,
        );
        self.inpos += nin;
        self.outpos = 0;
        self.outlen = nout;
        if self.eof && res == CoderResult::InputEmpty {
            self.done = true;
        }
        Ok(())
    }
}

impl<R: io::Read> io::Read for DecodeReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.outpos == self.outlen {
            if self.done {
                return Ok(0);
            }
            self.decode_more()?;
        }
        let n = cmp::min(buf.len(), self.outlen - self.outpos);
        buf[..n].copy_from_slice(&self.outbuf[self.outpos..self.outpos + n]);
        self.outpos += n;
        Ok(n)
    }
}

/// An `io::Write` adapter that encodes UTF-8 text into a target encoding.
///
/// `encoding_rs` only encodes into encodings that can appear on the web, so
/// UTF-16 labels produce UTF-8 output. A character that the target encoding
/// cannot represent is an `InvalidData` error.
pub struct EncodeWriter<W: io::Write> {
    wtr: Option<W>,
    encoder: Encoder,
    /// UTF-8 bytes received but not yet encoded (an incomplete character).
    pending: Vec<u8>,
    outbuf: Vec<u8>,
    finished: bool,
}

impl<W: io::Write> EncodeWriter<W> {
    /// Encode into `wtr` using `encoding`.
    pub fn new(wtr: W, encoding: &'static Encoding) -> EncodeWriter<W> {
        EncodeWriter {
            wtr: Some(wtr),
            encoder: encoding.new_encoder(),
            pending: vec![],
            outbuf: vec![0; BUF_SIZE],
            finished: false,
        }
    }

    /// The encoding actually produced.
    pub fn encoding(&self) -> &'static Encoding {
        self.encoder.encoding()
    }

    /// Flush the encoder state. No more text may be written afterwards.
    pub fn finish(&mut self) -> io::Result<()> {
        if self.finished {
            return Ok(());
        }
        if !self.pending.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "incomplete UTF-8 sequence at end of text",
            ));
        }
        self.encode(0, true)?;
        self.finished = true;
        self.get_mut()?.flush()
    }

    /// Finish encoding and unwrap the sink.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.finish()?;
        match self.wtr.take() {
            Some(wtr) => Ok(wtr),
            None => Err(sink_gone()),
        }
    }

    fn get_mut(&mut self) -> io::Result<&mut W> {
        self.wtr.as_mut().ok_or_else(sink_gone)
    }

    /// Encode the first `valid` bytes of `pending`.
    fn encode(&mut self, valid: usize, last: bool) -> io::Result<()> {
        let wtr = match self.wtr.as_mut() {
            Some(wtr) => wtr,
            None => return Err(sink_gone()),
        };
        let mut text = match str::from_utf8(&self.pending[..valid]) {
            Ok(text) => text,
            Err(err) => {
                return Err(io::Error::new(io::ErrorKind::InvalidData, err))
            }
        };
        loop {
            let (res, nin, nout) = self.encoder.encode_from_utf8_without_replacement(
                text,
                &mut self.outbuf,
                last,
            );
            wtr.write_all(&self.outbuf[..nout])?;
            text = &text[nin..];
            match res {
                EncoderResult::InputEmpty => break,
                EncoderResult::OutputFull => {}
                EncoderResult::Unmappable(c) => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!(
                            "character {:?} cannot be encoded in {}",
                            c,
                            self.encoder.encoding().name()
                        ),
                    ));
                }
            }
        }
        self.pending.drain(..valid);
        Ok(())
    }
}

impl<W: io::Write> io::Write for EncodeWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.finished {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "write after the encoder was finished",
            ));
        }
        self.pending.extend_from_slice(data);
        let checked = str::from_utf8(&self.pending).map(|text| text.len());
        let valid = match checked {
            Ok(len) => len,
            Err(err) if err.error_len().is_none() => err.valid_up_to(),
            Err(err) => {
                self.pending.truncate(self.pending.len() - data.len());
                return Err(io::Error::new(io::ErrorKind::InvalidData, err));
            }
        };
        self.encode(valid, false)?;
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.get_mut()?.flush()
    }
}

impl<W: io::Write> Drop for EncodeWriter<W> {
    fn drop(&mut self) {
        if self.wtr.is_some() {
            let _ = self.finish();
        }
    }
}

fn sink_gone() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "encoded sink was already taken")
}

/// Where a reader pulls its UTF-8 text from.
pub(crate) enum Source<R> {
    Plain(R),
    Decoded(DecodeReader<R>),
}

impl<R: io::Read> Source<R> {
    pub(crate) fn new(rdr: R, encoding: Option<&'static Encoding>) -> Source<R> {
        match encoding {
            Some(enc) if !is_utf8(Some(enc)) => {
                Source::Decoded(DecodeReader::new(rdr, enc))
            }
            _ => Source::Plain(rdr),
        }
    }

    pub(crate) fn into_inner(self) -> R {
        match self {
            Source::Plain(rdr) => rdr,
            Source::Decoded(rdr) => rdr.into_inner(),
        }
    }
}

impl<R: io::Read> io::Read for Source<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match *self {
            Source::Plain(ref mut rdr) => rdr.read(buf),
            Source::Decoded(ref mut rdr) => rdr.read(buf),
        }
    }
}

/// Where a writer pushes its UTF-8 text to.
pub(crate) enum Sink<W: io::Write> {
    Plain(W),
    Encoded(EncodeWriter<W>),
}

impl<W: io::Write> Sink<W> {
    pub(crate) fn new(wtr: W, encoding: Option<&'static Encoding>) -> Sink<W> {
        match encoding {
            Some(enc) if !is_utf8(Some(enc)) => {
                Sink::Encoded(EncodeWriter::new(wtr, enc))
            }
            _ => Sink::Plain(wtr),
        }
    }

    /// Flush any encoder state. Plain sinks have none.
    pub(crate) fn finish(&mut self) -> io::Result<()> {
        match *self {
            Sink::Plain(_) => Ok(()),
            Sink::Encoded(ref mut wtr) => wtr.finish(),
        }
    }

    pub(crate) fn into_inner(self) -> io::Result<W> {
        match self {
            Sink::Plain(wtr) => Ok(wtr),
            Sink::Encoded(wtr) => wtr.into_inner(),
        }
    }
}

impl<W: io::Write> io::Write for Sink<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        match *self {
            Sink::Plain(ref mut wtr) => wtr.write(data),
            Sink::Encoded(ref mut wtr) => wtr.write(data),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match *self {
            Sink::Plain(ref mut wtr) => wtr.flush(),
            Sink::Encoded(ref mut wtr) => wtr.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};

    use super::{has_utf8_bom, lookup, DecodeReader, EncodeWriter};
    use crate::error::Error;

    #[test]
    fn labels() {
        assert_eq!(encoding_rs::UTF_8, lookup("utf-8").unwrap());
        assert_eq!(encoding_rs::UTF_8, lookup(" UTF8 ").unwrap());
        assert_eq!(encoding_rs::WINDOWS_1252, lookup("latin1").unwrap());
        match lookup("klingon") {
            Err(Error::UnknownEncoding(label)) => assert_eq!("klingon", label),
            other => panic!("unexpected: {:?}", other.map(|e| e.name())),
        }
    }

    #[test]
    fn bom() {
        assert!(has_utf8_bom(b"\xEF\xBB\xBFa,b"));
        assert!(!has_utf8_bom(b"a,b"));
    }

    #[test]
    fn decode_latin1() {
        let data: &[u8] = b"caf\xE9,na\xEFve\r\n";
        let mut rdr = DecodeReader::new(data, encoding_rs::WINDOWS_1252);
        let mut got = String::new();
        rdr.read_to_string(&mut got).unwrap();
        assert_eq!("café,naïve\r\n", got);
    }

    #[test]
    fn decode_utf16_with_bom() {
        let mut data = vec![0xFF, 0xFE];
        for unit in "a,ü".encode_utf16() {
            data.extend_from_slice(&unit.to_le_bytes());
        }
        let mut rdr = DecodeReader::new(&data[..], encoding_rs::UTF_8);
        let mut got = String::new();
        rdr.read_to_string(&mut got).unwrap();
        assert_eq!("a,ü", got);
    }

    #[test]
    fn decode_tiny_reads() {
        let data: &[u8] = b"\xE9\xE9\xE9";
        let mut rdr = DecodeReader::new(data, encoding_rs::WINDOWS_1252);
        let mut got = vec![];
        let mut buf = [0; 1];
        loop {
            let n = rdr.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            got.extend_from_slice(&buf[..n]);
        }
        assert_eq!("ééé", String::from_utf8(got).unwrap());
    }

    #[test]
    fn encode_latin1_split_characters() {
        let mut wtr = EncodeWriter::new(vec![], encoding_rs::WINDOWS_1252);
        let text = "é,ü".as_bytes();
        // Split in the middle of the two byte 'é'.
        wtr.write_all(&text[..1]).unwrap();
        wtr.write_all(&text[1..]).unwrap();
        assert_eq!(b"\xE9,\xFC".to_vec(), wtr.into_inner().unwrap());
    }

    #[test]
    fn encode_unmappable() {
        let mut wtr = EncodeWriter::new(vec![], encoding_rs::WINDOWS_1252);
        let err = wtr.write_all("☃".as_bytes()).unwrap_err();
        assert_eq!(std::io::ErrorKind::InvalidData, err.kind());
    }
}
