pub(super) mod util;
