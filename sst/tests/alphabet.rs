//! A fixed, easy-to-reason-about twenty-six-entry table (the letters A-Z, lower-cased as their
//! own values) used to exercise cursor navigation against a handful of different block layouts.

extern crate sst;

#[macro_export]
macro_rules! alphabet_tests {
    ($($name:ident: $alphabet:expr,)*) => {
    $(
        #[cfg(test)]
        mod $name {
            use sst::Cursor;

            #[test]
            fn step_the_alphabet_forward() {
                let mut cursor = $alphabet(&(stringify!($name).to_string() + "::step_the_alphabet_forward"));
                cursor.seek_to_first().unwrap();
                let mut letters = Vec::new();
                while cursor.valid() {
                    letters.push(cursor.key().unwrap().to_vec());
                    cursor.next().unwrap();
                }
                let expected: Vec<Vec<u8>> = (b'A'..=b'Z').map(|c| vec![c]).collect();
                assert_eq!(expected, letters);
            }

            #[test]
            fn step_the_alphabet_reverse() {
                let mut cursor = $alphabet(&(stringify!($name).to_string() + "::step_the_alphabet_reverse"));
                cursor.seek_to_last().unwrap();
                let mut letters = Vec::new();
                while cursor.valid() {
                    letters.push(cursor.key().unwrap().to_vec());
                    cursor.prev().unwrap();
                }
                let expected: Vec<Vec<u8>> = (b'A'..=b'Z').rev().map(|c| vec![c]).collect();
                assert_eq!(expected, letters);
            }

            #[test]
            fn seek_to_first_lands_on_a() {
                let mut cursor = $alphabet(&(stringify!($name).to_string() + "::seek_to_first_lands_on_a"));
                cursor.seek_to_first().unwrap();
                assert_eq!(Some(&b"A"[..]), cursor.key());
                assert_eq!(Some(&b"a"[..]), cursor.value());
            }

            #[test]
            fn seek_to_last_lands_on_z() {
                let mut cursor = $alphabet(&(stringify!($name).to_string() + "::seek_to_last_lands_on_z"));
                cursor.seek_to_last().unwrap();
                assert_eq!(Some(&b"Z"[..]), cursor.key());
                assert_eq!(Some(&b"z"[..]), cursor.value());
            }

            #[test]
            fn seek_before_a_lands_on_a() {
                let mut cursor = $alphabet(&(stringify!($name).to_string() + "::seek_before_a_lands_on_a"));
                cursor.seek("@".as_bytes()).unwrap();
                assert_eq!(Some(&b"A"[..]), cursor.key());
            }

            #[test]
            fn seek_to_z_is_the_last_entry() {
                let mut cursor = $alphabet(&(stringify!($name).to_string() + "::seek_to_z_is_the_last_entry"));
                cursor.seek("Z".as_bytes()).unwrap();
                assert_eq!(Some(&b"Z"[..]), cursor.key());
                cursor.next().unwrap();
                assert!(!cursor.valid());
            }

            #[test]
            fn seek_past_z_is_invalid() {
                let mut cursor = $alphabet(&(stringify!($name).to_string() + "::seek_past_z_is_invalid"));
                cursor.seek("ZZ".as_bytes()).unwrap();
                assert!(!cursor.valid());
            }

            #[test]
            fn two_steps_forward_one_step_reverse_tracks_the_alphabet() {
                // A net-forward, oscillating gait over the whole alphabet. Exercises restart-index
                // re-anchoring for Next and Prev crossing restart boundaries in both directions
                // within the same traversal.
                let mut cursor = $alphabet(&(stringify!($name).to_string() + "::two_steps_forward_one_step_reverse_tracks_the_alphabet"));
                cursor.seek_to_first().unwrap();
                let mut position = 0i32;
                for _ in 0..25 {
                    cursor.next().unwrap();
                    position += 1;
                    if position == 25 {
                        break;
                    }
                    cursor.next().unwrap();
                    position += 1;
                    cursor.prev().unwrap();
                    position -= 1;
                    let expected = (b'A' + position as u8) as char;
                    let got = cursor.key().map(|k| k[0] as char);
                    assert_eq!(Some(expected), got);
                }
                assert_eq!(25, position);
            }

            #[test]
            fn two_steps_reverse_one_step_forward_tracks_the_alphabet() {
                let mut cursor = $alphabet(&(stringify!($name).to_string() + "::two_steps_reverse_one_step_forward_tracks_the_alphabet"));
                cursor.seek_to_last().unwrap();
                let mut position = 25i32;
                for _ in 0..25 {
                    cursor.prev().unwrap();
                    position -= 1;
                    if position == 0 {
                        break;
                    }
                    cursor.prev().unwrap();
                    position -= 1;
                    cursor.next().unwrap();
                    position += 1;
                    let expected = (b'A' + position as u8) as char;
                    let got = cursor.key().map(|k| k[0] as char);
                    assert_eq!(Some(expected), got);
                }
                assert_eq!(0, position);
            }

            #[test]
            fn seek_then_prev_then_next_returns_to_the_same_letter() {
                let mut cursor = $alphabet(&(stringify!($name).to_string() + "::seek_then_prev_then_next_returns_to_the_same_letter"));
                for letter in [b'C', b'M', b'Z'] {
                    cursor.seek(&[letter]).unwrap();
                    let key = cursor.key().unwrap().to_vec();
                    cursor.prev().unwrap();
                    cursor.next().unwrap();
                    assert_eq!(Some(key.as_slice()), cursor.key());
                }
            }
        }
    )*
    }
}
