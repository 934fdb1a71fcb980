//! 기동 시 레지스트리 초기화 과정을 터미널에 출력하는 헬퍼

pub fn print_boxed_title(title: &str) {
    let border = "═".repeat(50);
    println!("╔{}╗", border);
    println!("║{:^49}║", title);
    println!("╚{}╝", border);
}

pub fn print_step_start(step: u8, description: &str) {
    println!("→ Step {}: {}", step, description);
}

pub fn print_step_complete(step: u8, description: &str, count: usize) {
    println!("✓ Step {}: {} ({} items)", step, description, count);
}

pub fn print_sub_task(name: &str, status: &str) {
    println!("   ├─ {}: {}", name, status);
}

pub fn print_final_summary(services: usize) {
    println!();
    print_boxed_title("🎉 SERVICE REGISTRY INITIALIZED");
    println!("   🔧 Services: {}", services);
    println!();
}
