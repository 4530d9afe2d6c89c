use anyhow::Result;

use inetvm::{Net, ReduceConfig, Reducer, compile, parse, render};

pub(crate) fn cmd_dump(source: &str, config: &ReduceConfig, reduced: bool) -> Result<()> {
    print!("{}", dump(source, config, reduced)?);
    Ok(())
}

fn dump(source: &str, config: &ReduceConfig, reduced: bool) -> Result<String> {
    let term = parse(source)?;
    let mut net = Net::new();
    let root = compile(&mut net, &term)?;
    if reduced {
        Reducer::new(config.clone()).normal_form(&mut net)?;
    }
    Ok(format!("root: {root}\n{}", render(&net)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dumps_before_and_after_reduction() -> Result<()> {
        let config = ReduceConfig::default();
        let before = dump("5 + 3", &config, false)?;
        assert!(before.starts_with("root: #3\n"), "{before}");
        assert!(before.contains("OPE(add)"), "{before}");
        let after = dump("5 + 3", &config, true)?;
        assert!(after.contains("NUM(8)"), "{after}");
        assert!(after.ends_with("nodes: 2, active pairs: 0\n"), "{after}");
        Ok(())
    }
}
