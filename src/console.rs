//! Short human-facing progress lines on stdout. Details go to the log file.

pub fn pass(message: &str) {
    println!("  ✅ {message}");
}

pub fn error(message: &str) {
    println!("  ❌ {message}");
}

pub fn canceled(message: &str) {
    println!("  ⌛ {message}");
}

pub fn warn(message: &str) {
    println!("  ⚠️ {message}");
}

pub fn info(message: &str) {
    println!("  ℹ️ {message}");
}

pub fn step(name: &str) {
    println!("\n🔎 {name}");
}

pub fn completed(message: &str) {
    println!("\n✅ {message}");
}
