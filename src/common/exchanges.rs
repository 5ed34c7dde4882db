use ethers::types::H160;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::str::FromStr;

/// Name fragments that mark a counterparty as a centralized exchange.
pub static EXCHANGE_NAME_FRAGMENTS: [&str; 7] =
    ["binance", "coinbase", "kraken", "okx", "bybit", "kucoin", "huobi"];

// Publicly labelled exchange hot wallets, so hex counterparties can carry a name.
lazy_static! {
    pub static ref EXCHANGE_LABELS: HashMap<H160, &'static str> = {
        let mut map = HashMap::new();
        let mut label = |address: &str, name: &'static str| {
            if let Ok(address) = H160::from_str(address) {
                map.insert(address, name);
            }
        };
        label("0x28C6c06298d514Db089934071355E5743bf21d60", "Binance 14");
        label("0x21a31Ee1afC51d94C2eFcCAa2092aD1028285549", "Binance 15");
        label("0xDFd5293D8e347dFe59E90eFd55b2956a1343963d", "Binance 16");
        label("0xBE0eB53F46cd790Cd13851d5EFf43D12404d33E8", "Binance 7");
        label("0x71660c4005BA85c37ccec55d0C4493E66Fe775d3", "Coinbase 1");
        label("0xA9D1e08C7793af67e9d92fe308d5697FB81d3E43", "Coinbase 10");
        label("0x267be1C1D684F78cb4F6a176C4911b741E4Ffdc0", "Kraken 4");
        label("0xDA9dfA130Df4dE4673b89022EE50ff26f6EA73Cf", "Kraken 13");
        label("0x6cC5F688a315f3dC28A7781717a9A798a59fDA7b", "OKX");
        label("0xf89d7b9c864f589bbF53a82105107622B35EaA40", "Bybit");
        label("0xD6216fC19DB775Df9774a6E33526131dA7D19a2c", "KuCoin 6");
        map
    };
}

/// Returns the public label of a known exchange wallet.
pub fn exchange_label(addr: &H160) -> Option<&'static str> {
    EXCHANGE_LABELS.get(addr).copied()
}

/// Returns true if `field` contains any exchange name fragment, ignoring case.
pub fn mentions_exchange(field: &str) -> bool {
    let field = field.to_lowercase();
    EXCHANGE_NAME_FRAGMENTS
        .iter()
        .any(|fragment| field.contains(fragment))
}
