pub mod hack;
pub mod net;
pub mod opt;

#[cfg(test)]
mod test;
