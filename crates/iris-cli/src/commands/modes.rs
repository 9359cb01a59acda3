use iris_core::mode::AnalysisMode;
use strum::IntoEnumIterator;

/// Prints every registered analysis mode with its intent and tone.
pub fn run() {
    for mode in AnalysisMode::iter() {
        let profile = mode.profile();
        println!("{}", mode);
        println!("  intent: {}", profile.intent);
        println!("  tone:   {}", profile.tone);
        println!();
    }
}
