//! Tonhub transfer links for funding a contract by hand.

use qrcode::render::unicode;
use qrcode::types::QrError;
use qrcode::QrCode;
use shared::{Address, Coins, FriendlyFormat};

pub const TRANSFER_BASE_URL: &str = "https://tonhub.com/transfer/";
pub const FUNDING_TEXT: &str = "Simple test transaction";
pub const FUNDING_AMOUNT: Coins = Coins::from_nano(10_000_000);

/// `https://tonhub.com/transfer/<address>?text=..&amount=<nanotons>`
pub fn transfer_link(
    address: &Address,
    test_only: bool,
    text: &str,
    amount: Coins,
) -> Result<String, serde_urlencoded::ser::Error> {
    let destination = address.to_friendly(FriendlyFormat {
        test_only,
        ..FriendlyFormat::default()
    });
    let amount = amount.as_nano().to_string();
    let query = serde_urlencoded::to_string([("text", text), ("amount", amount.as_str())])?;
    // form encoding turns spaces into '+', a literal '+' is already %2B
    Ok(format!(
        "{}{}?{}",
        TRANSFER_BASE_URL,
        destination,
        query.replace('+', "%20")
    ))
}

/// Link paying the default 0.01 TON with the default comment
pub fn funding_link(address: &Address, test_only: bool) -> Result<String, serde_urlencoded::ser::Error> {
    transfer_link(address, test_only, FUNDING_TEXT, FUNDING_AMOUNT)
}

/// Compact terminal QR code, two modules per character row
pub fn qr_code(link: &str) -> Result<String, QrError> {
    let code = QrCode::new(link.as_bytes())?;
    Ok(code
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> Address {
        "EQD9jGNwJs3Sv5y1OWNIq_jXxWqrGi8q10zLIB3SZwdak1Ui"
            .parse()
            .unwrap()
    }

    #[test]
    fn test_funding_link_on_testnet() {
        assert_eq!(
            funding_link(&address(), true).unwrap(),
            "https://tonhub.com/transfer/kQD9jGNwJs3Sv5y1OWNIq_jXxWqrGi8q10zLIB3SZwdak-6o?text=Simple%20test%20transaction&amount=10000000"
        );
    }

    #[test]
    fn test_funding_link_on_mainnet() {
        let link = funding_link(&address(), false).unwrap();
        assert!(link.starts_with(
            "https://tonhub.com/transfer/EQD9jGNwJs3Sv5y1OWNIq_jXxWqrGi8q10zLIB3SZwdak1Ui?"
        ));
    }

    #[test]
    fn test_qr_code_renders_block_rows() {
        let link = funding_link(&address(), true).unwrap();
        let qr = qr_code(&link).unwrap();
        let rows: Vec<&str> = qr.lines().collect();
        assert!(rows.len() > 10);
        let width = rows[0].chars().count();
        assert!(rows.iter().all(|r| r.chars().count() == width));
        assert!(qr.chars().all(|c| matches!(c, ' ' | '\u{2580}' | '\u{2584}' | '\u{2588}' | '\n')));
    }

    #[test]
    fn test_text_is_escaped() {
        let link = transfer_link(&address(), false, "a+b & c", Coins::from_ton(1)).unwrap();
        assert!(link.ends_with("?text=a%2Bb%20%26%20c&amount=1000000000"));
    }
}
