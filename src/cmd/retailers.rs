use super::Context;

pub fn cmd_retailers(ctx: &Context) {
    println!("{:<14} {:<20} {:<28} SELF-TEST ISBN", "NAME", "DISPLAY NAME", "MEDIA");
    for retailer in ctx.registry.iter() {
        println!(
            "{:<14} {:<20} {:<28} {}",
            retailer.name(),
            retailer.display_name(),
            retailer.offering().to_string(),
            retailer.self_test_isbn()
        );
    }
    println!("\n({} retailers)", ctx.registry.len());
}
