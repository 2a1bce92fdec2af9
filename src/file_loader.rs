use crate::error::Error;
use crate::state::State;
use byteorder::{BigEndian, ReadBytesExt};
use std::fs::File;
use std::io::{self, BufReader, Read};

/// Opens `path` and loads it into `state`'s memory (see `load_into` for the wire format).
/// Multiple images may be loaded into the same `State` in sequence; later images overwrite
/// earlier ones at overlapping addresses.
pub fn load_image(path: &str, state: &mut State) -> Result<(), Error> {
    log::info!("loading image {}", path);

    let to_error = |source: io::Error| Error::ImageLoad {
        path: path.to_string(),
        source,
    };

    let file = File::open(path).map_err(to_error)?;
    load_into(BufReader::new(file), state).map_err(to_error)
}

/// Reads a big-endian origin word followed by big-endian 16-bit program words, writing them
/// into `state`'s memory starting at the origin, one word per successive address. Stops at
/// end-of-stream or at the end of memory, whichever comes first — an oversized image is
/// truncated rather than treated as an error.
pub(crate) fn load_into<R: Read>(mut reader: R, state: &mut State) -> io::Result<()> {
    let origin = match reader.read_u16::<BigEndian>() {
        Ok(origin) => origin,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
        Err(e) => return Err(e),
    };

    let mut address = origin;
    loop {
        match reader.read_u16::<BigEndian>() {
            Ok(word) => {
                state.memory.write(address, word);

                if address == u16::max_value() {
                    log::warn!("image reached the end of memory; remaining bytes ignored");
                    break;
                }
                address = address.wrapping_add(1);
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        }
    }

    Ok(())
}
