//! Block reads, plain and authenticated.
//!
//! Both loops walk block numbers from zero and stop at the card's command
//! error, which is how a service signals its last block. Any other error is
//! a read failure.

use felica_core::{
    Block, ServiceCode,
    constants::{AUTHENTICATED_SERVICE_INDEX, MAX_BLOCKS},
};
use felica_hardware::{FelicaTag, TagError};

fn block_numbers() -> impl Iterator<Item = u16> {
    (0..MAX_BLOCKS).filter_map(|n| u16::try_from(n).ok())
}

/// Read `service` without authentication.
///
/// Stops on a command error or a response shorter than one block.
///
/// # Errors
/// Returns the first transceiver error that is not a command error.
pub fn read_without_encryption<T: FelicaTag + ?Sized>(
    tag: &mut T,
    service: ServiceCode,
) -> Result<Vec<Block>, TagError> {
    let mut blocks = Vec::new();

    for number in block_numbers() {
        let response = match tag.read_without_encryption(service.as_u16(), number) {
            Ok(response) => response,
            Err(e) if e.is_command_error() => break,
            Err(e) => return Err(e),
        };
        match Block::from_response(number, &response) {
            Some(block) => blocks.push(block),
            None => break,
        }
    }

    Ok(blocks)
}

/// Read the service authenticated last, through its service slot.
///
/// Stops on a command error or an empty response; longer responses are
/// truncated to the first block.
///
/// # Errors
/// Returns the first transceiver error that is not a command error.
pub fn read_authenticated<T: FelicaTag + ?Sized>(tag: &mut T) -> Result<Vec<Block>, TagError> {
    let mut blocks = Vec::new();

    for number in block_numbers() {
        let response = match tag.read_blocks(AUTHENTICATED_SERVICE_INDEX, number) {
            Ok(response) => response,
            Err(e) if e.is_command_error() => break,
            Err(e) => return Err(e),
        };
        if response.is_empty() {
            break;
        }
        match Block::from_response(number, &response) {
            Some(block) => blocks.push(block),
            None => break,
        }
    }

    Ok(blocks)
}
