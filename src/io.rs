use std::io::{self, Read, Write};

/// The blocking character-level I/O primitives the TRAP handlers need from the host.
/// Kept as a trait, rather than calling `std::io::stdin()`/`stdout()` directly from
/// `state::execute`, so the trap handlers can be driven by an in-memory double in tests.
pub trait HostIo {
    fn read_char(&mut self) -> io::Result<u8>;
    fn write_char(&mut self, byte: u8) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
}

/// Production implementation: reads/writes the process's real stdin/stdout.
#[derive(Debug, Default)]
pub struct StdIo;

impl HostIo for StdIo {
    fn read_char(&mut self) -> io::Result<u8> {
        let mut buffer = [0; 1];
        io::stdin().read_exact(&mut buffer)?;
        Ok(buffer[0])
    }

    fn write_char(&mut self, byte: u8) -> io::Result<()> {
        io::stdout().write_all(&[byte])
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }
}

/// In-memory double for tests: reads from a preloaded input buffer, records every
/// written byte into a shared output buffer. The buffer is reference-counted so a
/// test can keep a handle to it after the `BufferedIo` has been boxed into a `State`.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct BufferedIo {
    input: std::collections::VecDeque<u8>,
    output: std::rc::Rc<std::cell::RefCell<Vec<u8>>>,
}

#[cfg(test)]
impl BufferedIo {
    pub fn with_input(input: &[u8]) -> Self {
        Self {
            input: input.iter().copied().collect(),
            output: Default::default(),
        }
    }

    pub fn output_handle(&self) -> std::rc::Rc<std::cell::RefCell<Vec<u8>>> {
        self.output.clone()
    }
}

#[cfg(test)]
impl HostIo for BufferedIo {
    fn read_char(&mut self) -> io::Result<u8> {
        self.input
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no more test input"))
    }

    fn write_char(&mut self, byte: u8) -> io::Result<()> {
        self.output.borrow_mut().push(byte);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
