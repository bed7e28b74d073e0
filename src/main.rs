// This binary crate is intentionally minimal.
// All engine logic lives in the library (src/lib.rs and its modules).
// Run demos with:
//   cargo run --example twoclass
fn main() {
    println!("graphite-nn: an embedded convolutional neural network engine in Rust.");
    println!("Run `cargo run --example twoclass` to see the two-point classifier demo.");
}
