mod applications;
mod common;
mod companies;
mod routing;
