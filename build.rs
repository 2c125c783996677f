fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-env-changed=GUROBI_PATH");
    #[cfg(feature = "gurobi")]
    {
        let path = std::env::var("GUROBI_PATH")
            .map_err(|_| "GUROBI_PATH must point to the folder of the Gurobi library")?;
        println!("cargo:rustc-link-search={path}");
    }
    Ok(())
}
