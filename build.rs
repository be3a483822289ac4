use vergen::{generate_cargo_keys, ConstantsFlags};

fn main() {
    let flags = ConstantsFlags::BUILD_DATE | ConstantsFlags::TARGET_TRIPLE;
    if let Err(e) = generate_cargo_keys(flags) {
        println!("cargo:warning=vergen: {}", e);
    }

    // winres shells out to the resource compiler, which only exists for Windows targets.
    if std::env::var("CARGO_CFG_TARGET_OS").map_or(false, |os| os == "windows") {
        let mut res = winres::WindowsResource::new();
        res.set("FileDescription", "CtrlWin");
        res.set("ProductName", "CtrlWin");
        if let Err(e) = res.compile() {
            println!("cargo:warning=winres: {}", e);
        }
    }
}
