mod injector;
