//! Box-drawing console output shared by all subcommands

pub const SYM_CHECK: &str = "\u{2713}";
pub const SYM_CROSS: &str = "\u{2717}";
pub const SYM_WARN: &str = "\u{26a0}";

const BOX_WIDTH: usize = 40;

/// Prints a boxed header above a subcommand's report
pub fn box_header(title: &str) {
    let title: String = title.chars().take(BOX_WIDTH - 4).collect();
    let padding = BOX_WIDTH - title.chars().count() - 4;
    println!();
    println!("\u{2554}{}\u{2557}", "\u{2550}".repeat(BOX_WIDTH - 2));
    println!("\u{2551}  {}{}\u{2551}", title, " ".repeat(padding));
    println!("\u{255a}{}\u{255d}", "\u{2550}".repeat(BOX_WIDTH - 2));
    println!();
}

/// Prints the boxed verdict below a subcommand's report
pub fn box_result(success: bool) {
    let msg = if success {
        format!("{} READY TO DEPLOY", SYM_CHECK)
    } else {
        format!("{} ISSUES FOUND", SYM_CROSS)
    };
    let padding = BOX_WIDTH.saturating_sub(msg.chars().count() + 4);
    println!();
    println!("\u{2554}{}\u{2557}", "\u{2550}".repeat(BOX_WIDTH - 2));
    println!("\u{2551}  {}{}\u{2551}", msg, " ".repeat(padding));
    println!("\u{255a}{}\u{255d}", "\u{2550}".repeat(BOX_WIDTH - 2));
}
