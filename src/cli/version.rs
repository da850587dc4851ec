/// Display version information
pub fn execute() {
    println!("arauto {}", env!("CARGO_PKG_VERSION"));
    println!("Operator CLI for the Arauto WhatsApp broadcast service");
}
