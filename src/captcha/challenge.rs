//! Challenge generation.

use captcha::Captcha;
use captcha::filters::{Dots, Noise, Wave};
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::warn;

use crate::database::CaptchaMode;
use crate::i18n::get_text;

/// Characters used for text codes. Look-alikes (0/o, 1/l/i) are left out.
const CODE_ALPHABET: &[u8] = b"23456789abcdefghjkmnpqrstuvwxyz";
const OPTION_COUNT: usize = 4;
const IMAGE_CODE_LEN: u32 = 4;
const IMAGE_WIDTH: u32 = 240;
const IMAGE_HEIGHT: u32 = 80;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    /// Question shown above the buttons.
    pub prompt: String,
    pub answer: String,
    /// Shuffled, contains `answer` exactly once.
    pub options: Vec<String>,
    /// PNG picture of the answer, image mode only.
    pub image: Option<Vec<u8>>,
}

pub fn generate<R: Rng>(mode: CaptchaMode, rng: &mut R) -> Challenge {
    match mode {
        CaptchaMode::Math => math(rng),
        CaptchaMode::Text => text(rng),
        CaptchaMode::Image => image(rng),
    }
}

fn math<R: Rng>(rng: &mut R) -> Challenge {
    let (prompt, answer): (String, i64) = match rng.gen_range(0..3) {
        0 => {
            let (a, b) = (rng.gen_range(1..=50), rng.gen_range(1..=50));
            (format!("{a} + {b}"), a + b)
        }
        1 => {
            let a: i64 = rng.gen_range(20..70);
            let b = rng.gen_range(1..=a);
            (format!("{a} - {b}"), a - b)
        }
        _ => {
            let (a, b) = (rng.gen_range(1..=12), rng.gen_range(1..=12));
            (format!("{a} × {b}"), a * b)
        }
    };

    let mut options = vec![answer.to_string()];
    while options.len() < OPTION_COUNT {
        let wrong = answer + rng.gen_range(-10..10);
        let wrong = wrong.to_string();
        if wrong != options[0] && !wrong.starts_with('-') && !options.contains(&wrong) {
            options.push(wrong);
        }
    }
    options.shuffle(rng);

    Challenge {
        prompt,
        answer: answer.to_string(),
        options,
        image: None,
    }
}

fn code<R: Rng>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// `answer` plus same-length decoys, shuffled.
fn code_options<R: Rng>(rng: &mut R, answer: &str) -> Vec<String> {
    let len = answer.chars().count();
    let mut options = vec![answer.to_string()];
    while options.len() < OPTION_COUNT {
        let decoy = code(rng, len);
        if !options.contains(&decoy) {
            options.push(decoy);
        }
    }
    options.shuffle(rng);
    options
}

fn text<R: Rng>(rng: &mut R) -> Challenge {
    let len = rng.gen_range(4..=6);
    let answer = code(rng, len);
    let options = code_options(rng, &answer);

    Challenge {
        prompt: answer.to_uppercase(),
        answer,
        options,
        image: None,
    }
}

/// Render a short code as a noisy picture. Falls back to a text challenge
/// when the picture cannot be encoded.
fn image<R: Rng>(rng: &mut R) -> Challenge {
    let alphabet: Vec<char> = CODE_ALPHABET.iter().map(|&b| char::from(b)).collect();
    let mut picture = Captcha::new();
    picture
        .set_chars(&alphabet)
        .add_chars(IMAGE_CODE_LEN)
        .apply_filter(Noise::new(0.2))
        .apply_filter(Wave::new(2.0, 12.0).horizontal())
        .view(IMAGE_WIDTH, IMAGE_HEIGHT)
        .apply_filter(Dots::new(8));

    let answer = picture.chars_as_string().to_lowercase();
    let Some(png) = picture.as_png() else {
        warn!("captcha image encoding failed, using a text challenge");
        return text(rng);
    };
    let options = code_options(rng, &answer);

    Challenge {
        prompt: get_text("en", "captcha.image_question"),
        answer,
        options,
        image: Some(png),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_math_options_contain_answer_once() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let c = generate(CaptchaMode::Math, &mut rng);
            assert_eq!(c.options.len(), 4);
            assert_eq!(c.options.iter().filter(|o| **o == c.answer).count(), 1);
            assert!(c.options.iter().all(|o| o.parse::<i64>().is_ok_and(|n| n >= 0)));
        }
    }

    #[test]
    fn test_math_answer_is_correct() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let c = generate(CaptchaMode::Math, &mut rng);
            let parts: Vec<&str> = c.prompt.split(' ').collect();
            let (a, b): (i64, i64) = (parts[0].parse().unwrap(), parts[2].parse().unwrap());
            let expected = match parts[1] {
                "+" => a + b,
                "-" => a - b,
                _ => a * b,
            };
            assert_eq!(c.answer, expected.to_string());
        }
    }

    #[test]
    fn test_text_codes() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let c = generate(CaptchaMode::Text, &mut rng);
            assert!((4..=6).contains(&c.answer.len()));
            assert_eq!(c.prompt, c.answer.to_uppercase());
            assert_eq!(c.options.len(), 4);
            assert!(c.options.iter().all(|o| o.len() == c.answer.len()));
            assert_eq!(c.options.iter().filter(|o| **o == c.answer).count(), 1);
        }
    }

    #[test]
    fn test_image_challenge_is_a_png_of_the_answer() {
        let mut rng = StdRng::seed_from_u64(5);
        let c = generate(CaptchaMode::Image, &mut rng);
        let png = c.image.expect("image mode renders a picture");
        assert_eq!(&png[..4], b"\x89PNG");
        assert_eq!(c.answer.chars().count(), IMAGE_CODE_LEN as usize);
        assert_eq!(c.options.len(), 4);
        assert_eq!(c.options.iter().filter(|o| **o == c.answer).count(), 1);
        assert!(generate(CaptchaMode::Text, &mut rng).image.is_none());
    }
}
