#![allow(dead_code)]

use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};

/// A domain config object as the repository stores it.
pub fn category(id: u64) -> Value {
    json!({"category": {"ref": {"id": id}, "data": {"name": format!("category {id}")}}})
}

/// Writes a shell script standing in for woorl and returns the `--woorl` value running it.
///
/// Inside the script `$6` is the called function and `$7`.. its arguments.
pub fn fake_woorl(dir: &Path, body: &str) -> String {
    let path: PathBuf = dir.join("woorl.sh");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    format!("sh {}", path.display())
}

pub fn write_csv(dir: &Path, lines: &[&str]) -> PathBuf {
    let path = dir.join("payments.csv");
    fs::write(&path, lines.join("\n")).unwrap();
    path
}

pub const PAYMENTS_HEADER: &str = "invoice_id,party_id,shop_id,product,amount,currency,provider_id,terminal_id,provider_transaction_id,recurrent_token,card_token,card_bin,card_last_digits";
