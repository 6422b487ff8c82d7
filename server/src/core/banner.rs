//! Startup banner

use super::constants::APP_NAME;

/// Print the startup banner.
pub fn print_banner(self_id: &str, address: &str, bootstrap: Option<&str>, data_dir: &str) {
    const W: usize = 12;

    println!();
    println!(
        "  \x1b[1m\x1b[36m{}\x1b[0m \x1b[90mv{}\x1b[0m",
        APP_NAME,
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!("  \x1b[32m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m {}", "Address:", address);
    println!("  \x1b[32m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m {}", "Id:", self_id);
    match bootstrap {
        Some(peer) => println!(
            "  \x1b[33m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m joining via {}",
            "Role:", peer
        ),
        None => println!("  \x1b[33m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m initial leader", "Role:"),
    }
    println!("  \x1b[90m➜  {:<W$} {}\x1b[0m", "Data:", data_dir);
    println!();
}
