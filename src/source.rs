use std::io::{self, BufRead};
use std::vec;

/// Characters from a line-buffered reader. A read failure ends the stream and
/// is kept for the caller to inspect with [`ReadChars::take_error`].
pub struct ReadChars<R> {
    reader: R,
    line: vec::IntoIter<char>,
    error: Option<io::Error>,
    done: bool,
}

impl<R: BufRead> ReadChars<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new().into_iter(),
            error: None,
            done: false,
        }
    }

    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    fn fill(&mut self) -> bool {
        let mut buf = String::new();
        match self.reader.read_line(&mut buf) {
            Ok(0) => false,
            Ok(_) => {
                self.line = buf.chars().collect::<Vec<_>>().into_iter();
                true
            }
            Err(e) => {
                self.error = Some(e);
                false
            }
        }
    }
}

impl<R: BufRead> Iterator for ReadChars<R> {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        loop {
            if let Some(c) = self.line.next() {
                return Some(c);
            }
            if self.done || !self.fill() {
                self.done = true;
                return None;
            }
        }
    }
}
