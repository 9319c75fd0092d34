//! Synthetic field values for generated records.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use uuid::Builder;

const COLORS: &[&str] = &[
    "AliceBlue", "Aqua", "Azure", "Beige", "Black", "Blue", "Brown", "Coral", "Crimson", "Cyan",
    "Fuchsia", "Gold", "Gray", "Green", "Indigo", "Ivory", "Khaki", "Lavender", "Lime", "Magenta",
    "Maroon", "Navy", "Olive", "Orange", "Orchid", "Pink", "Plum", "Purple", "Red", "Salmon",
    "Silver", "Tan", "Teal", "Tomato", "Turquoise", "Violet", "Wheat", "White", "Yellow",
];

const CITIES: &[&str] = &[
    "New York", "New Orleans", "Newark", "New Haven", "Newport", "Boston", "Chicago", "Denver",
    "Houston", "Seattle", "Portland", "Phoenix", "Atlanta", "Austin", "Dallas", "Detroit",
    "Memphis", "Miami", "Nashville", "Omaha", "Raleigh", "Sacramento", "San Diego", "Tampa",
    "Tucson", "Wichita", "Lincoln", "Madison", "Fresno", "Buffalo",
];

const BEERS: &[&str] = &[
    "Pliny The Elder", "Two Hearted Ale", "Bells Hopslam Ale", "Stone Imperial Russian Stout",
    "Westvleteren 12", "La Fin Du Monde", "Sierra Nevada Bigfoot", "Founders Breakfast Stout",
    "Trappistes Rochefort 10", "Duvel", "Orval Trappist Ale", "Arrogant Bastard Ale",
    "Ten FIDY", "Old Rasputin", "Hop Wallop", "Celebrator Doppelbock", "Alpha King",
    "Racer 5 IPA", "Sculpin IPA", "Hercules Double IPA",
];

const CARS: &[&str] = &[
    "Civic", "Accord", "Corolla", "Camry", "Prius", "Mustang", "F150", "Focus", "Golf", "Jetta",
    "Passat", "Model 3", "Outback", "Forester", "Impreza", "Miata", "CX-5", "Altima", "Sentra",
    "Elantra", "Sonata", "Tacoma", "Wrangler", "Cherokee", "Silverado", "Malibu", "A4", "Q5",
    "3 Series", "X5",
];

/// Source of synthetic field values.
pub trait SyntheticSource {
    /// High-entropy identifier, unique with overwhelming probability.
    fn unique_token(&mut self) -> String;
    /// Uniform integer in `[low, high]`.
    fn number(&mut self, low: i64, high: i64) -> i64;
    fn boolean(&mut self) -> bool;
    fn color(&mut self) -> &'static str;
    fn city(&mut self) -> &'static str;
    fn beer(&mut self) -> &'static str;
    fn car(&mut self) -> &'static str;
}

/// [`SyntheticSource`] backed by any [`Rng`].
pub struct FakeSource<R> {
    rng: R,
}

impl<R: Rng> FakeSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    fn pick(&mut self, values: &'static [&'static str]) -> &'static str {
        values.choose(&mut self.rng).copied().unwrap_or_default()
    }
}

impl FakeSource<StdRng> {
    /// Reproducible values for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn from_seed_option(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }
}

impl<R: Rng> SyntheticSource for FakeSource<R> {
    fn unique_token(&mut self) -> String {
        Builder::from_random_bytes(self.rng.gen())
            .into_uuid()
            .hyphenated()
            .to_string()
    }

    fn number(&mut self, low: i64, high: i64) -> i64 {
        self.rng.gen_range(low..=high)
    }

    fn boolean(&mut self) -> bool {
        self.rng.gen_bool(0.5)
    }

    fn color(&mut self) -> &'static str {
        self.pick(COLORS)
    }

    fn city(&mut self) -> &'static str {
        self.pick(CITIES)
    }

    fn beer(&mut self) -> &'static str {
        self.pick(BEERS)
    }

    fn car(&mut self) -> &'static str {
        self.pick(CARS)
    }
}
