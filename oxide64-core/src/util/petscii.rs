// This file is part of oxide64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

// SPEC: https://sites.google.com/site/h2obsession/CBM/petscii

/// Translates an unshifted PETSCII code point to its printable ASCII
/// equivalent, or 0 if the code point has no ASCII counterpart.
pub fn pet_to_ascii(code: u8) -> u8 {
    match code {
        0..=31 => 0,
        32..=63 => code,
        64 => 64,
        65..=90 => code + 32,
        91 => 91,
        93 => 93,
        94 => 94,
        125 => 124,
        160 => 32,
        192 => 0,
        193..=218 => code - 128,
        221 => 124,
        _ => 0,
    }
}

/// Translates a printable ASCII byte to unshifted PETSCII, or 0 if the
/// byte has no PETSCII counterpart. The documented subset (digits,
/// punctuation and uppercase/lowercase letters) round-trips through
/// `pet_to_ascii` . `ascii_to_pet`.
pub fn ascii_to_pet(code: u8) -> u8 {
    match code {
        32..=63 => code,
        64 => 64,
        65..=90 => code + 128,
        91 => 91,
        93 => 93,
        94 => 94,
        97..=122 => code - 32,
        124 => 125,
        _ => 0,
    }
}

/// Translates a VIC-II screen code (as stored in screen memory) to its
/// printable ASCII equivalent.
pub fn screen_code_to_ascii(code: u8) -> u8 {
    match code {
        0 => 64,
        1..=31 => 96 + code,
        32..=90 => code,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documented_subset_round_trips() {
        for ascii in 0x20u8..=0x5a {
            let pet = ascii_to_pet(ascii);
            if pet != 0 {
                assert_eq!(ascii, pet_to_ascii(pet), "ascii={}", ascii);
            }
        }
    }

    #[test]
    fn uppercase_letters_are_codes_193_to_218() {
        assert_eq!(b'A', pet_to_ascii(193));
        assert_eq!(b'Z', pet_to_ascii(218));
    }

    #[test]
    fn lowercase_letters_live_at_65_to_90() {
        assert_eq!(b'a', pet_to_ascii(65));
        assert_eq!(b'z', pet_to_ascii(90));
    }

    #[test]
    fn screen_code_at_large() {
        assert_eq!(b'@', screen_code_to_ascii(0));
        assert_eq!(b'a', screen_code_to_ascii(1));
        assert_eq!(b'0', screen_code_to_ascii(48));
    }
}
