// SPDX-License-Identifier: GPL-3.0-only

//! Static data compiled into the binary

use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Assets;

/// Fetch an embedded asset as UTF-8 text
pub fn text(name: &str) -> Option<String> {
    let file = Assets::get(name)?;
    String::from_utf8(file.data.into_owned()).ok()
}
