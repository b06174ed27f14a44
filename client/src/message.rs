//! Message envelopes: the relaxed internal message a wallet forwards and the
//! inbound external message carrying the wallet's signed request.

use shared::{Address, Cell, CellBuilder, CodecError, Coins, StateInit};

/// `int_msg_info$0 ihr_disabled:1 bounce bounced:0 src:addr_none dest value
/// ihr_fee:0 fwd_fee:0 created_lt:0 created_at:0`, then init and body as refs
pub fn internal_message(
    to: &Address,
    value: Coins,
    bounce: bool,
    init: Option<&StateInit>,
    body: &Cell,
) -> Result<Cell, CodecError> {
    let mut b = CellBuilder::new();
    b.store_bit(false)?
        .store_bit(true)?
        .store_bit(bounce)?
        .store_bit(false)?
        .store_address_none()?
        .store_address(to)?
        .store_coins(value)?
        // no extra currencies
        .store_bit(false)?
        .store_coins(Coins::ZERO)?
        .store_coins(Coins::ZERO)?
        .store_uint(0, 64)?
        .store_uint(0, 32)?;
    store_init_and_body(&mut b, init, body)?;
    Ok(b.build())
}

/// `ext_in_msg_info$10 src:addr_none dest import_fee:0`, then init and body
pub fn external_message(
    to: &Address,
    init: Option<&StateInit>,
    body: &Cell,
) -> Result<Cell, CodecError> {
    let mut b = CellBuilder::new();
    b.store_uint(0b10, 2)?
        .store_address_none()?
        .store_address(to)?
        .store_coins(Coins::ZERO)?;
    store_init_and_body(&mut b, init, body)?;
    Ok(b.build())
}

fn store_init_and_body(
    b: &mut CellBuilder,
    init: Option<&StateInit>,
    body: &Cell,
) -> Result<(), CodecError> {
    match init {
        Some(init) => {
            b.store_bit(true)?.store_bit(true)?.store_ref(init.to_cell()?)?;
        }
        None => {
            b.store_bit(false)?;
        }
    }
    b.store_bit(true)?.store_ref(body.clone())?;
    Ok(())
}
